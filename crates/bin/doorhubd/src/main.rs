//! # doorhubd — doorhub daemon
//!
//! Composition root that wires GPIO lines, devices, monitors and the HTTP
//! layer together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`doorhub.toml`, `DOORHUB_*` env vars)
//! - Initialize logging
//! - Open relay and sense lines, build the device registry and monitors
//! - Attach the event broadcaster to every device
//! - Build the axum router and serve it over mutual TLS, or plain HTTP when
//!   no TLS files are configured
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod hardware;
mod tls;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use doorhub_adapter_http_axum::auth::AccessPolicy;
use doorhub_adapter_http_axum::router;
use doorhub_adapter_http_axum::state::AppState;
use doorhub_app::broadcaster::EventBroadcaster;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Hardware
    let wiring = hardware::wire(&config)
        .await
        .context("failed to set up GPIO lines")?;

    // Events
    let broadcaster = Arc::new(EventBroadcaster::new(
        Arc::clone(&wiring.registry),
        config.events.capacity,
    ));
    broadcaster
        .attach()
        .context("failed to attach event broadcaster")?;

    // Inputs
    for monitor in wiring.monitors {
        monitor.spawn();
    }
    let _virtual_inputs = wiring.virtual_inputs;

    // HTTP
    let policy = AccessPolicy::new(config.security.allowed_origins.iter().cloned())
        .allow_anonymous(config.security.allow_anonymous);
    let state = AppState::new(wiring.registry, broadcaster, policy);
    let app = router::build(state, config.server.static_dir.as_deref());

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    match config.tls.paths()? {
        Some(paths) => {
            let server_config = tls::server_config(&paths).context("failed to load TLS files")?;
            tracing::info!(address = %bind_addr, "doorhubd listening on https");
            tls::serve(listener, server_config, app, shutdown_signal()).await;
        }
        None => {
            tracing::warn!(
                address = %bind_addr,
                "no TLS files configured, serving plain http without client identities"
            );
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
    }

    tracing::info!("doorhubd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
