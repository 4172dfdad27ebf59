// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML file, environment overrides, validation

use crate::kinds::KindName;
use converge_adapters::{HttpProviderConfig, HttpWatchSourceConfig};
use converge_core::RetryPolicy;
use converge_engine::ReconcilerConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("no endpoint configured for {0} (set [kinds.{0}] endpoint or {1}_ENDPOINT)")]
    MissingEndpoint(KindName, String),
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the API server holding the declared resources
    pub api_url: String,
    /// API group and version of the declared resources
    pub group: String,
    pub namespace: String,
    /// Identity recorded as the owner of created resources
    pub owner: String,
    /// Log to this file instead of stderr
    pub log_path: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub relist_delay: Duration,
    /// Watch events buffered per kind
    pub watch_buffer: usize,
    pub retry: RetryPolicy,
    pub kinds: BTreeMap<KindName, KindConfig>,
}

/// Provider settings for one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KindConfig {
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8001".to_string(),
            group: "converge.io/v1".to_string(),
            namespace: "default".to_string(),
            owner: "converge".to_string(),
            log_path: None,
            relist_delay: ReconcilerConfig::default().relist_delay,
            watch_buffer: 256,
            retry: RetryPolicy::default(),
            kinds: BTreeMap::new(),
        }
    }
}

/// Default config location, e.g. `~/.config/converge/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("converge").join("config.toml"))
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::NotFound(path));
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `CONVERGE_<KIND>_ENDPOINT` / `CONVERGE_<KIND>_REGION` overrides
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for kind in KindName::ALL {
            let prefix = kind.env_prefix();
            let endpoint = lookup(&format!("{}_ENDPOINT", prefix));
            let region = lookup(&format!("{}_REGION", prefix));
            if endpoint.is_none() && region.is_none() {
                continue;
            }
            let entry = self.kinds.entry(kind).or_default();
            if endpoint.is_some() {
                entry.endpoint = endpoint;
            }
            if region.is_some() {
                entry.region = region;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        if self.group.trim().is_empty() {
            return Err(ConfigError::Invalid("group must not be empty".to_string()));
        }
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::Invalid("namespace must not be empty".to_string()));
        }
        if self.owner.trim().is_empty() {
            return Err(ConfigError::Invalid("owner must not be empty".to_string()));
        }
        if self.watch_buffer == 0 {
            return Err(ConfigError::Invalid("watch_buffer must be positive".to_string()));
        }
        Ok(())
    }

    /// Kinds to run: the requested ones, or every configured kind
    pub fn selected_kinds(&self, requested: &[KindName]) -> Vec<KindName> {
        let mut kinds: Vec<KindName> = if requested.is_empty() {
            self.kinds.keys().copied().collect()
        } else {
            requested.to_vec()
        };
        kinds.sort();
        kinds.dedup();
        kinds
    }

    pub fn reconciler(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            relist_delay: self.relist_delay,
        }
    }

    pub fn watch_source(&self, kind: KindName) -> HttpWatchSourceConfig {
        HttpWatchSourceConfig {
            api_url: self.api_url.clone(),
            group: self.group.clone(),
            namespace: self.namespace.clone(),
            plural: kind.plural().to_string(),
            buffer: self.watch_buffer,
        }
    }

    pub fn provider(&self, kind: KindName) -> Result<HttpProviderConfig, ConfigError> {
        let settings = self.kinds.get(&kind).cloned().unwrap_or_default();
        let endpoint = settings
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEndpoint(kind, kind.env_prefix()))?;
        Ok(HttpProviderConfig {
            endpoint,
            plural: kind.plural().to_string(),
            region: settings.region,
            owner: self.owner.clone(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
