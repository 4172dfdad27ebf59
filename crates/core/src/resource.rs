// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed resource identity and snapshots

use crate::cursor::ResourceVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of externally managed entity (queue, role, bucket, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKind(pub String);

impl ResourceKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ResourceKind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceKind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of a managed resource: `(kind, namespace, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        kind: impl Into<ResourceKind>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// Full snapshot of a declared resource as carried by a list or watch event.
///
/// The spec type is opaque to the engine; adapters give it meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedResource<S> {
    pub key: ResourceKey,
    pub resource_version: ResourceVersion,
    pub spec: S,
}

impl<S> ManagedResource<S> {
    pub fn new(key: ResourceKey, resource_version: ResourceVersion, spec: S) -> Self {
        Self {
            key,
            resource_version,
            spec,
        }
    }

    /// Resource name, the serialization key within a kind
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.key.kind
    }
}

/// Result of listing the full declared collection of one kind
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList<S> {
    /// Version of the collection at the time of listing
    pub version: ResourceVersion,
    pub items: Vec<ManagedResource<S>>,
}

impl<S> ResourceList<S> {
    pub fn new(version: ResourceVersion, items: Vec<ManagedResource<S>>) -> Self {
        Self { version, items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
