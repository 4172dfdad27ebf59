// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch events and the adapter actions they map to

use crate::resource::ManagedResource;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State-changing call to issue against a resource adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Event type tag as sent by the watch source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    Error,
    Other(String),
}

impl EventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "ADDED" => EventType::Added,
            "MODIFIED" => EventType::Modified,
            "DELETED" => EventType::Deleted,
            "ERROR" => EventType::Error,
            other => EventType::Other(other.to_string()),
        }
    }
}

/// A single event from a watch stream.
///
/// The end of the stream is signalled by the channel closing, not by an event.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent<S> {
    Added(ManagedResource<S>),
    Modified(ManagedResource<S>),
    Deleted(ManagedResource<S>),
    /// Error reported in-band by the source; the stream stays open
    Error {
        code: Option<u16>,
        message: String,
    },
    /// Event type this client does not understand
    Unrecognized { event_type: String },
}

impl<S> WatchEvent<S> {
    /// Consume the event, yielding the action and the owned resource
    pub fn into_action(self) -> Option<(Action, ManagedResource<S>)> {
        match self {
            WatchEvent::Added(r) => Some((Action::Create, r)),
            WatchEvent::Modified(r) => Some((Action::Update, r)),
            WatchEvent::Deleted(r) => Some((Action::Delete, r)),
            WatchEvent::Error { .. } | WatchEvent::Unrecognized { .. } => None,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "ADDED",
            WatchEvent::Modified(_) => "MODIFIED",
            WatchEvent::Deleted(_) => "DELETED",
            WatchEvent::Error { .. } => "ERROR",
            WatchEvent::Unrecognized { .. } => "UNRECOGNIZED",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
