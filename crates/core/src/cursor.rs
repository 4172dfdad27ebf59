// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource versions and the per-kind reconciliation cursor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Monotonically increasing version token issued by the watch source.
///
/// Sources transmit versions as decimal strings; they are compared numerically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceVersion(u64);

impl ResourceVersion {
    pub fn new(version: u64) -> Self {
        Self(version)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a resource version token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resource version: {0:?}")]
pub struct InvalidVersion(pub String);

impl FromStr for ResourceVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| InvalidVersion(s.to_string()))
    }
}

impl TryFrom<String> for ResourceVersion {
    type Error = InvalidVersion;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ResourceVersion> for String {
    fn from(v: ResourceVersion) -> Self {
        v.to_string()
    }
}

/// Highest resource version observed so far for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationCursor {
    current: ResourceVersion,
}

impl ReconciliationCursor {
    pub fn new(baseline: ResourceVersion) -> Self {
        Self { current: baseline }
    }

    pub fn current(&self) -> ResourceVersion {
        self.current
    }

    /// Advance to `version` if it is newer. Returns whether the cursor moved.
    pub fn observe(&mut self, version: ResourceVersion) -> bool {
        if version > self.current {
            self.current = version;
            true
        } else {
            false
        }
    }

    /// Replace the cursor with the version of a fresh listing.
    ///
    /// A relist is a new baseline, so this may move the cursor backwards.
    pub fn rebase(&mut self, baseline: ResourceVersion) {
        self.current = baseline;
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
