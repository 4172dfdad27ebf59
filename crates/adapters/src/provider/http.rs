// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-over-HTTP provider client
//!
//! Resources live at `{endpoint}/{plural}/{name}`. Requests carry the owner
//! identity and, when configured, the target region as headers. Status codes
//! and error bodies are mapped onto [`ProviderError`]:
//!
//! - 404 → `NotFound`
//! - 409 `{"code":"OperationAborted"}` → `OperationAborted`
//! - 409 otherwise → `AlreadyExists`, owned when `owner` matches ours
//! - 422 `{"field","current","desired"}` → `ImmutableField`
//! - connection refused / host unreachable → transient `Network`

use super::{ProviderClient, ProviderSpec};
use async_trait::async_trait;
use converge_core::{NetworkReason, ProviderError, ResourceKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::sync::Arc;

const OWNER_HEADER: &str = "x-converge-owner";
const REGION_HEADER: &str = "x-converge-region";

/// Largest response body accepted (ureq stops at 10 MiB by default)
const MAX_BODY_BYTES: u64 = 1 << 30;

/// Connection settings for one kind's provider endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpProviderConfig {
    /// Base URL, e.g. `http://127.0.0.1:9324`
    pub endpoint: String,
    /// Collection path segment, e.g. `queues`
    pub plural: String,
    pub region: Option<String>,
    /// Identity recorded as the owner of created resources
    pub owner: String,
}

/// Provider client speaking JSON over HTTP
#[derive(Clone)]
pub struct HttpProvider<S> {
    kind: ResourceKind,
    config: Arc<HttpProviderConfig>,
    agent: ureq::Agent,
    _spec: PhantomData<fn() -> S>,
}

struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    owner: Option<String>,
    field: Option<String>,
    current: Option<String>,
    desired: Option<String>,
}

#[derive(Serialize)]
struct CreateBody<'a, S> {
    name: &'a str,
    spec: &'a S,
}

impl<S> HttpProvider<S> {
    pub fn new(kind: impl Into<ResourceKind>, config: HttpProviderConfig) -> Self {
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

    pub fn config(&self) -> &HttpProviderConfig {
        &self.config
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.plural
        )
    }

    fn resource_url(&self, name: &str) -> String {
        format!("{}/{}", self.collection_url(), name)
    }

    fn status_error(&self, name: &str, response: &RawResponse) -> ProviderError {
        status_error(response.status, name, &response.body, &self.config.owner)
    }
}

#[async_trait]
impl<S> ProviderClient for HttpProvider<S>
where
    S: ProviderSpec + Serialize + DeserializeOwned,
{
    type Spec = S;

    fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    async fn describe(&self, name: &str) -> Result<Option<S>, ProviderError> {
        let agent = self.agent.clone();
        let config = Arc::clone(&self.config);
        let url = self.resource_url(name);

        let response = blocking(move || {
            let mut request = agent
                .get(&url)
                .header(OWNER_HEADER, config.owner.as_str());
            if let Some(region) = &config.region {
                request = request.header(REGION_HEADER, region.as_str());
            }
            let mut response = request.call()?;
            let status = response.status().as_u16();
            let body = read_body(&mut response)?;
            Ok(RawResponse { status, body })
        })
        .await?;

        match response.status {
            404 => Ok(None),
            _ if response.is_success() => serde_json::from_str(&response.body)
                .map(Some)
                .map_err(|e| ProviderError::Rejected {
                    code: "InvalidResponse".to_string(),
                    message: format!("cannot decode {}: {}", name, e),
                }),
            _ => Err(self.status_error(name, &response)),
        }
    }

    async fn create(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        let payload = encode(name, &CreateBody { name, spec })?;
        let agent = self.agent.clone();
        let config = Arc::clone(&self.config);
        let url = self.collection_url();

        let response = blocking(move || {
            let mut request = agent
                .post(&url)
                .header(OWNER_HEADER, config.owner.as_str())
                .header("content-type", "application/json");
            if let Some(region) = &config.region {
                request = request.header(REGION_HEADER, region.as_str());
            }
            let mut response = request.send(&payload[..])?;
            let status = response.status().as_u16();
            let body = read_body(&mut response)?;
            Ok(RawResponse { status, body })
        })
        .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(self.status_error(name, &response))
        }
    }

    async fn update(&self, name: &str, spec: &S) -> Result<(), ProviderError> {
        let payload = encode(name, spec)?;
        let agent = self.agent.clone();
        let config = Arc::clone(&self.config);
        let url = self.resource_url(name);

        let response = blocking(move || {
            let mut request = agent
                .put(&url)
                .header(OWNER_HEADER, config.owner.as_str())
                .header("content-type", "application/json");
            if let Some(region) = &config.region {
                request = request.header(REGION_HEADER, region.as_str());
            }
            let mut response = request.send(&payload[..])?;
            let status = response.status().as_u16();
            let body = read_body(&mut response)?;
            Ok(RawResponse { status, body })
        })
        .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(self.status_error(name, &response))
        }
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        let agent = self.agent.clone();
        let config = Arc::clone(&self.config);
        let url = self.resource_url(name);

        let response = blocking(move || {
            let mut request = agent
                .delete(&url)
                .header(OWNER_HEADER, config.owner.as_str());
            if let Some(region) = &config.region {
                request = request.header(REGION_HEADER, region.as_str());
            }
            let mut response = request.call()?;
            let status = response.status().as_u16();
            let body = read_body(&mut response)?;
            Ok(RawResponse { status, body })
        })
        .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(self.status_error(name, &response))
        }
    }
}

fn encode<T: Serialize>(name: &str, value: &T) -> Result<Vec<u8>, ProviderError> {
    serde_json::to_vec(value).map_err(|e| ProviderError::Rejected {
        code: "InvalidSpec".to_string(),
        message: format!("cannot encode {}: {}", name, e),
    })
}

fn read_body(response: &mut ureq::http::Response<ureq::Body>) -> Result<String, ureq::Error> {
    response
        .body_mut()
        .with_config()
        .limit(MAX_BODY_BYTES)
        .read_to_string()
}

/// Run a blocking HTTP exchange off the async runtime
async fn blocking<F>(exchange: F) -> Result<RawResponse, ProviderError>
where
    F: FnOnce() -> Result<RawResponse, ureq::Error> + Send + 'static,
{
    match tokio::task::spawn_blocking(exchange).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => Err(transport_error(e)),
        Err(e) => Err(ProviderError::Rejected {
            code: "Internal".to_string(),
            message: format!("request task failed: {}", e),
        }),
    }
}

/// Map a transport-level failure onto the provider taxonomy
fn transport_error(error: ureq::Error) -> ProviderError {
    let reason = match &error {
        ureq::Error::Io(io) => match io.kind() {
            ErrorKind::ConnectionRefused => NetworkReason::ConnectionRefused,
            ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
                NetworkReason::HostUnreachable
            }
            _ => NetworkReason::Other(io.to_string()),
        },
        other => NetworkReason::Other(other.to_string()),
    };
    ProviderError::network(reason)
}

/// Map a non-success status and its JSON error body onto the provider taxonomy
fn status_error(status: u16, name: &str, body: &str, owner: &str) -> ProviderError {
    let detail: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    match status {
        404 => ProviderError::NotFound(name.to_string()),
        409 if detail.code.as_deref() == Some("OperationAborted") => {
            ProviderError::OperationAborted(
                detail
                    .message
                    .unwrap_or_else(|| format!("conflicting operation on {}", name)),
            )
        }
        409 => ProviderError::AlreadyExists {
            name: name.to_string(),
            owned: detail.owner.as_deref() == Some(owner),
        },
        422 if detail.field.is_some() => ProviderError::ImmutableField {
            field: detail.field.unwrap_or_default(),
            current: detail.current.unwrap_or_default(),
            desired: detail.desired.unwrap_or_default(),
        },
        _ => ProviderError::Rejected {
            code: detail.code.unwrap_or_else(|| status.to_string()),
            message: detail.message.unwrap_or_else(|| body.to_string()),
        },
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
