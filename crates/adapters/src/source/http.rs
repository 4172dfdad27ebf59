// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch source speaking the Kubernetes list/watch JSON convention
//!
//! `GET {api}/apis/{group}/namespaces/{ns}/{plural}` lists the collection;
//! adding `?watch=true&resourceVersion=N` streams newline-delimited
//! `{"type": ..., "object": ...}` events until the server closes the response.

use super::{SourceError, WatchSource, WatchStream};
use async_trait::async_trait;
use converge_core::{
    EventType, ManagedResource, ResourceKey, ResourceKind, ResourceList, ResourceVersion,
    WatchEvent,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Largest list body accepted (ureq stops at 10 MiB by default)
const MAX_LIST_BYTES: u64 = 1 << 30;

/// Location of one kind's collection on the API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpWatchSourceConfig {
    /// API server base URL, e.g. `http://127.0.0.1:8001`
    pub api_url: String,
    /// API group and version, e.g. `converge.io/v1`
    pub group: String,
    pub namespace: String,
    /// Collection name, e.g. `queues`
    pub plural: String,
    /// Events buffered between the reader thread and the reconciler
    pub buffer: usize,
}

/// Watch source backed by an HTTP API server
pub struct HttpWatchSource<S> {
    kind: ResourceKind,
    config: Arc<HttpWatchSourceConfig>,
    agent: ureq::Agent,
    _spec: PhantomData<fn() -> S>,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(rename = "resourceVersion")]
    resource_version: ResourceVersion,
}

#[derive(Deserialize)]
struct ListMeta {
    #[serde(rename = "resourceVersion")]
    resource_version: ResourceVersion,
}

#[derive(Deserialize)]
struct WireList {
    metadata: ListMeta,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct WireObject<S> {
    metadata: ObjectMeta,
    spec: S,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct WireStatus {
    code: Option<u16>,
    message: Option<String>,
}

impl<S> HttpWatchSource<S> {
    pub fn new(kind: impl Into<ResourceKind>, config: HttpWatchSourceConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build(),
        );
        Self {
            kind: kind.into(),
            config: Arc::new(config),
            agent,
            _spec: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/apis/{}/namespaces/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.group,
            self.config.namespace,
            self.config.plural
        )
    }

    fn watch_url(&self, from: ResourceVersion) -> String {
        format!(
            "{}?watch=true&resourceVersion={}",
            self.collection_url(),
            from
        )
    }
}

#[async_trait]
impl<S> WatchSource for HttpWatchSource<S>
where
    S: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Spec = S;

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn list(&self) -> Result<ResourceList<S>, SourceError> {
        let agent = self.agent.clone();
        let url = self.collection_url();

        let (status, body) = tokio::task::spawn_blocking(move || {
            let mut response = agent.get(&url).call()?;
            let status = response.status().as_u16();
            let body = response
                .body_mut()
                .with_config()
                .limit(MAX_LIST_BYTES)
                .read_to_string()?;
            Ok::<_, ureq::Error>((status, body))
        })
        .await
        .map_err(|e| SourceError::Connection(format!("list task failed: {}", e)))?
        .map_err(|e| SourceError::Connection(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(SourceError::Status {
                status,
                message: body,
            });
        }
        parse_list(&self.kind, &self.config.namespace, &body)
    }

    async fn watch(&self, from: ResourceVersion) -> Result<WatchStream<S>, SourceError> {
        let agent = self.agent.clone();
        let url = self.watch_url(from);
        let kind = self.kind.clone();
        let namespace = self.config.namespace.clone();
        let (tx, rx) = mpsc::channel(self.config.buffer.max(1));
        let (opened_tx, opened_rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let mut response = match agent.get(&url).call() {
                Ok(response) => response,
                Err(e) => {
                    let _ = opened_tx.send(Err(SourceError::Connection(e.to_string())));
                    return;
                }
            };
            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                let message = response.body_mut().read_to_string().unwrap_or_default();
                let _ = opened_tx.send(Err(SourceError::Status { status, message }));
                return;
            }
            let _ = opened_tx.send(Ok(()));

            let reader = BufReader::new(response.into_body().into_reader());
            for line in reader.lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!(kind = %kind, error = %e, "watch stream read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.blocking_send(parse_event(&kind, &namespace, &line)).is_err() {
                    break;
                }
            }
            tracing::debug!(kind = %kind, "watch stream closed");
        });

        match opened_rx.await {
            Ok(Ok(())) => Ok(rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SourceError::Connection(
                "watch task exited before opening".to_string(),
            )),
        }
    }
}

fn decode_object<S: DeserializeOwned>(
    kind: &ResourceKind,
    default_namespace: &str,
    value: serde_json::Value,
) -> Result<ManagedResource<S>, String> {
    let name = value
        .pointer("/metadata/name")
        .and_then(|n| n.as_str())
        .unwrap_or("<unnamed>")
        .to_string();
    let object: WireObject<S> =
        serde_json::from_value(value).map_err(|e| format!("cannot decode {}: {}", name, e))?;
    let namespace = object
        .metadata
        .namespace
        .unwrap_or_else(|| default_namespace.to_string());
    Ok(ManagedResource::new(
        ResourceKey::new(kind.clone(), namespace, object.metadata.name),
        object.metadata.resource_version,
        object.spec,
    ))
}

/// Parse a list response. Items that fail to decode are skipped.
fn parse_list<S: DeserializeOwned>(
    kind: &ResourceKind,
    namespace: &str,
    body: &str,
) -> Result<ResourceList<S>, SourceError> {
    let list: WireList = serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    let mut items = Vec::with_capacity(list.items.len());
    for value in list.items {
        match decode_object(kind, namespace, value) {
            Ok(resource) => items.push(resource),
            Err(message) => tracing::warn!(kind = %kind, %message, "skipping undecodable item"),
        }
    }
    Ok(ResourceList::new(list.metadata.resource_version, items))
}

/// Parse one line of a watch stream
fn parse_event<S: DeserializeOwned>(kind: &ResourceKind, namespace: &str, line: &str) -> WatchEvent<S> {
    let event: WireEvent = match serde_json::from_str(line) {
        Ok(event) => event,
        Err(e) => {
            return WatchEvent::Error {
                code: None,
                message: format!("malformed watch event: {}", e),
            }
        }
    };

    let decode = |object| match decode_object(kind, namespace, object) {
        Ok(resource) => Ok(resource),
        Err(message) => Err(WatchEvent::Error {
            code: None,
            message,
        }),
    };

    let result = match EventType::parse(&event.event_type) {
        EventType::Added => decode(event.object).map(WatchEvent::Added),
        EventType::Modified => decode(event.object).map(WatchEvent::Modified),
        EventType::Deleted => decode(event.object).map(WatchEvent::Deleted),
        EventType::Error => {
            let status: WireStatus = serde_json::from_value(event.object).unwrap_or_default();
            Ok(WatchEvent::Error {
                code: status.code,
                message: status.message.unwrap_or_default(),
            })
        }
        EventType::Other(event_type) => Ok(WatchEvent::Unrecognized { event_type }),
    };
    result.unwrap_or_else(|error_event| error_event)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
