mod bootstrap;
mod conversations;
mod error;
mod health;
mod push;
mod routes;
mod service;
#[cfg(test)]
mod testing;
mod webhook;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use hookrelay_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use hookrelay_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "hookrelay-server listening"
    );

    axum::serve(
        listener,
        routes::router(app.service.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for_shutdown())
    .await?;

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        in_flight = app.service.tasks.len(),
        "draining reply tasks"
    );
    if !app.service.drain_tasks(grace).await {
        tracing::warn!(
            event_name = "system.server.drain_timeout",
            correlation_id = "shutdown",
            abandoned = app.service.tasks.len(),
            "reply tasks still running after grace period"
        );
    }
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "hookrelay-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}
