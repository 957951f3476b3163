//! API gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                     API GATEWAY                      │
//!                          │                                                      │
//!   Client Request         │  ┌────────┐   ┌─────────┐   ┌──────────┐             │
//!   ───────────────────────┼─▶│  http  │──▶│ routing │──▶│ security │             │
//!                          │  │ server │   │ matcher │   │  limits  │             │
//!                          │  └────────┘   └─────────┘   └────┬─────┘             │
//!                          │                                  ▼                   │
//!                          │                            ┌──────────┐              │
//!                          │                            │  cache   │──hit──┐      │
//!                          │                            └────┬─────┘       │      │
//!                          │                                 ▼ miss        │      │
//!                          │  ┌────────────────────────────────────────┐   │      │
//!                          │  │ engine: beforewares → backends →       │──────────┼──▶ Backends
//!                          │  │         afterwares → writer (aggregate)│   │      │
//!                          │  └──────────────────┬─────────────────────┘   │      │
//!   Client Response        │  ┌────────┐         │                         │      │
//!   ◀──────────────────────┼──│response│◀────────┴─────────────────────────┘      │
//!                          │  └────────┘                                          │
//!                          │  config (hot reload) · observability · lifecycle     │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;

use api_gateway::config::{load_config, watcher::ConfigWatcher};
use api_gateway::lifecycle::{SignalEvent, Signals};
use api_gateway::observability::{logging, metrics};
use api_gateway::{HttpServer, Shutdown};

/// Forced exit deadline once shutdown has been triggered.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "api-gateway")]
#[command(about = "HTTP API gateway orchestrating backend calls per endpoint", long_about = None)]
struct Args {
    /// Configuration file (.toml, .json, .yaml or .yml).
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    validate: bool,

    /// Do not watch the configuration file for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.config).map_err(|e| {
        eprintln!("failed to load {}: {}", args.config.display(), e);
        e
    })?;

    logging::init(&config.observability)?;

    if args.validate {
        tracing::info!(
            path = %args.config.display(),
            endpoints = config.endpoints.len(),
            "Configuration is valid"
        );
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        path = %args.config.display(),
        bind_address = %config.listener.bind_address,
        endpoints = config.endpoints.len(),
        middlewares = config.middlewares.len(),
        "api-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let reload_tx = watcher.sender();
    let _watch_guard = if args.no_watch {
        None
    } else {
        match watcher.run() {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                None
            }
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();
    let mut server_handle = tokio::spawn(async move {
        server.run(listener, config_updates, server_shutdown).await
    });

    let mut signals = Signals::new()?;
    loop {
        tokio::select! {
            event = signals.recv() => match event {
                SignalEvent::Shutdown => break,
                SignalEvent::Reload => match load_config(&args.config) {
                    Ok(config) => {
                        if reload_tx.send(config).is_err() {
                            tracing::warn!("Server no longer accepts config updates");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Reload failed, keeping current configuration"),
                },
            },
            result = &mut server_handle => {
                match result {
                    Ok(Ok(())) => tracing::info!("Server exited"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Server failed"),
                    Err(e) => tracing::error!(error = %e, "Server task panicked"),
                }
                return Ok(());
            }
        }
    }

    shutdown.trigger();
    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => tracing::info!("Shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server failed during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task panicked"),
        Err(_) => tracing::warn!(
            timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "Drain deadline exceeded, forcing exit"
        ),
    }
    Ok(())
}
