//! Listener supervision.
//!
//! One task per configured listener plus the optional redirect listener. A
//! task that fails is logged and the rest keep serving. On shutdown every
//! listener stops accepting and drains in-flight requests.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use axum_server::Handle;
use tokio::task::JoinSet;

use peerway_api::{serve_listener, serve_redirect};
use peerway_core::GatewayConfig;

/// How long in-flight requests get to finish after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Serve until `shutdown` resolves. Listener failures never end the process.
pub async fn run(
    app: Router,
    config: &GatewayConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    let mut handles = Vec::new();

    for listener in config.listeners() {
        let handle = Handle::new();
        handles.push(handle.clone());
        let app = app.clone();

        tasks.spawn(async move {
            let address = listener.address.clone();
            if let Err(e) = serve_listener(app, listener, handle).await {
                tracing::error!(address = %address, error = ?e, "listener failed");
            }
            address
        });
    }

    if let Some(address) = config.redirect_address() {
        let handle = Handle::new();
        handles.push(handle.clone());

        tasks.spawn(async move {
            if let Err(e) = serve_redirect(&address, handle).await {
                tracing::error!(address = %address, error = ?e, "redirect listener failed");
            }
            address
        });
    }

    if tasks.is_empty() {
        anyhow::bail!("no listen addresses configured");
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown signal received");
                break;
            }
            joined = tasks.join_next() => match joined {
                Some(Ok(address)) => tracing::warn!(address = %address, "listener stopped"),
                Some(Err(e)) => tracing::error!(error = %e, "listener task panicked"),
                None => {
                    tracing::error!("every listener has stopped; waiting for shutdown");
                    (&mut shutdown).await;
                    tracing::info!("shutdown signal received");
                    break;
                }
            },
        }
    }

    for handle in &handles {
        handle.graceful_shutdown(Some(DRAIN_TIMEOUT));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "listener task panicked during shutdown");
        }
    }
    tracing::info!("all listeners drained");
    Ok(())
}
