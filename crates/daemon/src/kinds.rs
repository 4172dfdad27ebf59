// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource kinds managed by the daemon and their spec types

use converge_adapters::{FieldChange, ProviderSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A resource kind the daemon knows how to reconcile
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum KindName {
    Queue,
    Role,
    Bucket,
}

impl KindName {
    pub const ALL: [KindName; 3] = [KindName::Queue, KindName::Role, KindName::Bucket];

    pub fn as_str(&self) -> &'static str {
        match self {
            KindName::Queue => "queue",
            KindName::Role => "role",
            KindName::Bucket => "bucket",
        }
    }

    /// Collection name used by the watch source and provider
    pub fn plural(&self) -> &'static str {
        match self {
            KindName::Queue => "queues",
            KindName::Role => "roles",
            KindName::Bucket => "buckets",
        }
    }

    /// Prefix of this kind's environment overrides, e.g. `CONVERGE_QUEUE`
    pub fn env_prefix(&self) -> String {
        format!("CONVERGE_{}", self.as_str().to_uppercase())
    }
}

impl fmt::Display for KindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    #[serde(default = "default_visibility_timeout")]
    pub visibility_timeout_secs: u32,
    #[serde(default = "default_retention")]
    pub retention_secs: u32,
    /// Fixed when the queue is created
    #[serde(default)]
    pub fifo: bool,
}

fn default_visibility_timeout() -> u32 {
    30
}

fn default_retention() -> u32 {
    4 * 24 * 60 * 60
}

impl ProviderSpec for QueueSpec {
    fn immutable_changes(&self, desired: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if self.fifo != desired.fifo {
            changes.push(FieldChange::new("fifo", self.fifo, desired.fifo));
        }
        changes
    }
}

/// Access role with attached policies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub assume_role_policy: String,
    #[serde(default)]
    pub policies: Vec<String>,
}

impl ProviderSpec for RoleSpec {}

/// Storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    /// Fixed when the bucket is created
    pub region: String,
    #[serde(default)]
    pub versioning: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ProviderSpec for BucketSpec {
    fn immutable_changes(&self, desired: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if self.region != desired.region {
            changes.push(FieldChange::new("region", &self.region, &desired.region));
        }
        changes
    }
}

#[cfg(test)]
#[path = "kinds_tests.rs"]
mod tests;
