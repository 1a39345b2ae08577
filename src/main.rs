//! tuya-pir-bridge - Tuya cloud motion sensor bridge
//!
//! Authenticates against the Tuya cloud API, keeps the access token renewed,
//! and polls the PIR flag of each configured device, exposing the result to a
//! home-automation host over HTTP.

mod accessory;
mod api;
mod config;
mod error;
mod platform;
mod tuya;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::accessory::{AccessoryRegistry, HostPlatform};
use crate::api::ApiState;
use crate::platform::Platform;
use crate::tuya::{CredentialManager, TuyaClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tuya_pir_bridge=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting tuya-pir-bridge...");

    // Load configuration (fails fast on missing or invalid settings)
    let config = config::Config::load().context("Invalid configuration")?;
    tracing::info!(
        "Configuration loaded: {} devices, poll interval {:?}",
        config.device_list.len(),
        config.poll_interval()
    );

    let client = Arc::new(TuyaClient::new(&config).context("Failed to create HTTP client")?);
    let credentials = Arc::new(CredentialManager::new(client, config.auth_retry_delay()));
    let host: Arc<dyn HostPlatform> = Arc::new(AccessoryRegistry::new());

    let platform = Arc::new(Platform::new(
        config.device_list.clone(),
        config.poll_interval(),
        Arc::clone(&credentials),
        Arc::clone(&host),
    ));

    let app = api::routes(ApiState {
        host,
        credentials,
    })
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Host is up: start the token lifecycle and device discovery
    platform.did_finish_launching().await;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    platform.shutdown().await;
    tracing::info!("tuya-pir-bridge stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
