// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Converge Daemon (converged)
//!
//! Watches declared resources and drives provider resources to match them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod kinds;
mod lifecycle;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::config::Config;
use crate::kinds::KindName;
use crate::lifecycle::{LifecycleError, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "converged",
    version,
    about = "Converge declared resources onto their providers"
)]
struct Args {
    /// Configuration file [default: <config dir>/converge/config.toml]
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Kind to reconcile; repeat for several [default: every configured kind]
    #[arg(long = "kind", value_enum)]
    kinds: Vec<KindName>,

    /// Namespace to watch, overriding the config file
    #[arg(long)]
    namespace: Option<String>,

    /// Log provider calls instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Log filter, e.g. `debug` or `converge_engine=trace` [default: RUST_LOG or info]
    #[arg(long)]
    log_level: Option<String>,
}

/// How long runtime shutdown waits for blocking tasks, such as watch readers
/// parked on an idle connection
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("converged: cannot start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    code
}

/// Run the daemon until a signal arrives. Every failure is reported exactly
/// once, on stderr or in the log.
async fn run(args: Args) -> ExitCode {
    // Load configuration (logging is not set up yet, so report on stderr)
    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("converged: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }

    // Set up logging
    let log_guard = match setup_logging(&config, args.log_level.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("converged: cannot set up logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let settings = Settings {
        kinds: config.selected_kinds(&args.kinds),
        config,
        dry_run: args.dry_run,
    };
    info!(
        api_url = %settings.config.api_url,
        namespace = %settings.config.namespace,
        kinds = ?settings.kinds,
        dry_run = settings.dry_run,
        "starting converged"
    );

    // Set up signal handlers before any reconciler runs
    let signals = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    );
    let (mut sigterm, mut sigint) = match signals {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to install signal handlers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Start reconcilers
    let controller = match lifecycle::startup(&settings).await {
        Ok(controller) => controller,
        Err(e) => {
            error!("Failed to start: {}", e);
            drop(log_guard);
            // Logs are going to a file; make sure the operator sees why
            if settings.config.log_path.is_some() {
                eprintln!("converged: failed to start: {}", e);
            }
            return ExitCode::FAILURE;
        }
    };

    info!(kinds = ?controller.kinds(), "converged ready");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    controller.shutdown().await;
    info!("converged stopped");
    drop(log_guard);
    ExitCode::SUCCESS
}

fn setup_logging(
    config: &Config,
    log_level: Option<&str>,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (non_blocking, guard, ansi) = match &config.log_path {
        Some(log_path) => {
            let dir = log_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)?;
            let file_name = log_path
                .file_name()
                .ok_or_else(|| LifecycleError::NoLogDir(log_path.clone()))?;
            let file_appender = tracing_appender::rolling::never(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (writer, guard, false)
        }
        None => {
            let ansi = std::io::stderr().is_terminal();
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            (writer, guard, ansi)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(ansi))
        .init();

    Ok(guard)
}
