//! peerwayd — public HTTP gateway to the peer network.

use std::sync::Arc;

use anyhow::{Context, Result};

use peerway_api::{router, GatewayState};
use peerway_core::GatewayConfig;
use peerway_services::{NodeApiNetwork, PeerConnector};

mod supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = GatewayConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = GatewayConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        GatewayConfig::default()
    });
    tracing::info!(
        listeners = config.web.listen.len(),
        tls = config.web.use_tls,
        node_api = %config.network.node_api,
        "peerwayd starting"
    );

    let write_timeout = config.web.timeout_write;
    if !write_timeout.is_zero() && write_timeout <= config.network.connect_timeout {
        tracing::warn!(
            ?write_timeout,
            connect_timeout = ?config.network.connect_timeout,
            "write timeout does not exceed connect timeout; slow peers will time out before answering"
        );
    }

    // Network backend
    let user_agent = format!("peerway/{}", env!("CARGO_PKG_VERSION"));
    let network = NodeApiNetwork::new(&config.network.node_api, &user_agent)
        .context("failed to set up node API client")?;
    let connector = PeerConnector::new(Arc::new(network), config.network.connect_timeout);

    let app = router(GatewayState::new(connector, config.web.files.clone()));

    supervisor::run(app, &config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}
