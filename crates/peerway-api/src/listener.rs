//! Serving the gateway on one configured listener.
//!
//! A listener is plain HTTP or HTTPS. Its read timeout bounds how long a
//! client may take to send request headers; its write timeout bounds the
//! whole request, including streaming the response body. A file larger than
//! the write timeout allows is cut off.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio::time::Instant;

use peerway_core::config::resolve_listen_address;
use peerway_core::ListenerConfig;

use crate::error::GatewayError;
use crate::handlers::redirect;

/// Point in time by which the current request must be fully answered.
#[derive(Debug, Clone, Copy)]
pub struct WriteDeadline(pub Instant);

async fn enforce_write_timeout(
    State(timeout): State<Duration>,
    mut request: Request,
    next: Next,
) -> Response {
    let deadline = Instant::now() + timeout;
    request.extensions_mut().insert(WriteDeadline(deadline));

    match tokio::time::timeout_at(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(?timeout, "request exceeded write timeout");
            GatewayError::WriteTimeout.into_response()
        }
    }
}

/// Apply a write timeout to every request. Zero disables it.
pub fn with_write_timeout(app: Router, timeout: Duration) -> Router {
    if timeout.is_zero() {
        return app;
    }
    app.layer(middleware::from_fn_with_state(timeout, enforce_write_timeout))
}

/// Build a TLS server configuration from PEM files.
///
/// Only TLS 1.2 and 1.3 are offered, and only HTTP/1.1 is negotiated.
pub fn load_tls_config(cert_file: &Path, key_file: &Path) -> Result<Arc<rustls::ServerConfig>> {
    let certs = CertificateDer::pem_file_iter(cert_file)
        .with_context(|| format!("failed to open certificate {}", cert_file.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificate {}", cert_file.display()))?;
    if certs.is_empty() {
        anyhow::bail!("no certificates in {}", cert_file.display());
    }

    let key = PrivateKeyDer::from_pem_file(key_file)
        .with_context(|| format!("failed to load private key {}", key_file.display()))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS12, &rustls::version::TLS13])
        .context("unsupported TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("certificate and key do not match")?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Bound how long a client may take to send request headers.
///
/// HTTP/2 has no header timeout in hyper, so idle HTTP/2 connections are
/// closed by keep-alive pings that go unanswered for the same duration.
fn apply_read_timeout(builder: &mut AutoBuilder<TokioExecutor>, read_timeout: Duration) {
    if read_timeout.is_zero() {
        return;
    }
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(read_timeout);
    builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(read_timeout)
        .keep_alive_timeout(read_timeout);
}

/// Serve `app` on one listener until it fails or `handle` shuts it down.
pub async fn serve_listener(app: Router, config: ListenerConfig, handle: Handle) -> Result<()> {
    let addr = config.socket_addr()?;
    let app = with_write_timeout(app, config.write_timeout).into_make_service();

    let served = if config.use_tls {
        let tls = load_tls_config(&config.cert_file, &config.key_file)?;
        tracing::info!(addr = %addr, "gateway listening (HTTPS)");

        let mut server =
            axum_server::bind_rustls(addr, RustlsConfig::from_config(tls)).handle(handle);
        apply_read_timeout(server.http_builder(), config.read_timeout);
        server.serve(app).await
    } else {
        tracing::info!(addr = %addr, "gateway listening (HTTP)");

        let mut server = axum_server::bind(addr).handle(handle);
        apply_read_timeout(server.http_builder(), config.read_timeout);
        server.serve(app).await
    };

    served.with_context(|| format!("listener {} failed", config.address))
}

/// Serve the HTTP → HTTPS redirect on `address`.
pub async fn serve_redirect(address: &str, handle: Handle) -> Result<()> {
    let addr = resolve_listen_address(address)?;
    tracing::info!(addr = %addr, "redirect listening");

    axum_server::bind(addr)
        .handle(handle)
        .serve(redirect::router().into_make_service())
        .await
        .with_context(|| format!("redirect listener {address} failed"))?;
    Ok(())
}
