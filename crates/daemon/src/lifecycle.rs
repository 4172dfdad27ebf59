// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use crate::config::{Config, ConfigError};
use crate::kinds::{BucketSpec, KindName, QueueSpec, RoleSpec};
use converge_adapters::{
    ConvergingAdapter, DryRunProvider, HttpProvider, HttpWatchSource, ProviderSpec,
    TracedResourceAdapter,
};
use converge_core::RetryExecutor;
use converge_engine::{Controller, EngineError, Reconciler};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors during daemon startup
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("No resource kinds configured (add a [kinds.<kind>] table or pass --kind)")]
    NoKinds,
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Could not determine log directory for {0}")]
    NoLogDir(std::path::PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to reconcile and how
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub kinds: Vec<KindName>,
    pub dry_run: bool,
}

/// Start one reconciler per selected kind.
///
/// If any kind fails its initial list, the kinds already started are shut
/// down before the error is returned.
pub async fn startup(settings: &Settings) -> Result<Controller, LifecycleError> {
    if settings.kinds.is_empty() {
        return Err(LifecycleError::NoKinds);
    }
    settings.config.validate()?;

    let mut controller = Controller::new();
    for &kind in &settings.kinds {
        let started = match kind {
            KindName::Queue => start_kind::<QueueSpec>(&mut controller, settings, kind).await,
            KindName::Role => start_kind::<RoleSpec>(&mut controller, settings, kind).await,
            KindName::Bucket => start_kind::<BucketSpec>(&mut controller, settings, kind).await,
        };
        if let Err(e) = started {
            controller.shutdown().await;
            return Err(e);
        }
    }
    Ok(controller)
}

async fn start_kind<S>(
    controller: &mut Controller,
    settings: &Settings,
    kind: KindName,
) -> Result<(), LifecycleError>
where
    S: ProviderSpec + Serialize + DeserializeOwned,
{
    let config = &settings.config;
    let source = HttpWatchSource::<S>::new(kind.as_str(), config.watch_source(kind));
    let retry = RetryExecutor::new(config.retry.clone());

    if settings.dry_run {
        info!(%kind, "dry run: provider calls are logged, not sent");
        let provider = DryRunProvider::<S>::new(kind.as_str());
        let adapter = TracedResourceAdapter::new(ConvergingAdapter::new(provider, retry));
        controller
            .spawn(Reconciler::new(source, adapter, config.reconciler()))
            .await?;
    } else {
        let provider_config = config.provider(kind)?;
        info!(%kind, endpoint = %provider_config.endpoint, "using provider");
        let provider = HttpProvider::<S>::new(kind.as_str(), provider_config);
        let adapter = TracedResourceAdapter::new(ConvergingAdapter::new(provider, retry));
        controller
            .spawn(Reconciler::new(source, adapter, config.reconciler()))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
