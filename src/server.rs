use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::{
    net::TcpListener,
    signal::unix::{SignalKind, signal},
};

use crate::{
    config::Config,
    proxy::{self, AppState},
    transport::{HttpBackend, RetryingClient},
};

pub fn build_router(config: &Config) -> Result<Router> {
    let backend = HttpBackend::new().context("unable to build backend http client")?;
    let client = RetryingClient::new(Arc::new(backend), config.retry.clone());
    let state = AppState::new(client, config.backend.clone());
    Ok(proxy::router(state, config.server.max_upload_bytes))
}

pub async fn run(config: Config) -> Result<()> {
    let app = build_router(&config)?;
    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("unable to bind {}", config.server.listen_addr))?;

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let shutdown = async move {
        let signal_name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        tracing::info!(target: "proxy", signal = signal_name, "shutdown_signal_received");
    };

    tracing::info!(
        target: "proxy",
        listen_addr = %config.server.listen_addr,
        backend = %config.backend.base_url,
        max_upload_bytes = config.server.max_upload_bytes,
        "proxy_listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("proxy server failed")?;

    tracing::info!(target: "proxy", "proxy_stopped");
    Ok(())
}
