//! Peerway integration test harness.
//!
//! Tests in this crate run the gateway on real loopback sockets against the
//! in-memory network backend and talk to it with an HTTP client. No peer node
//! or root privileges are needed:
//!
//!   cargo test --test integration
//!
//! Every gateway is bound to an ephemeral port and shut down when its
//! `Gateway` guard drops.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum_server::Handle;

use peerway_api::{router, serve_listener, GatewayState};
use peerway_core::ListenerConfig;
use peerway_services::{MemoryNetwork, PeerConnector};

mod gateway;

// ── Harness ───────────────────────────────────────────────────────────────────

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh scratch directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("peerway-it-{tag}-{}-{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Knobs for one test gateway.
pub struct GatewayOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub tls: Option<(PathBuf, PathBuf)>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(30),
            tls: None,
        }
    }
}

/// A running gateway. Shuts its listener down on drop.
pub struct Gateway {
    pub addr: SocketAddr,
    pub files_dir: PathBuf,
    handle: Handle,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn https_url(&self, path: &str) -> String {
        format!("https://localhost:{}{path}", self.addr.port())
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.handle.shutdown();
        let _ = std::fs::remove_dir_all(&self.files_dir);
    }
}

/// Start a gateway over `network` on 127.0.0.1 with an ephemeral port.
pub async fn start_gateway(network: Arc<MemoryNetwork>, options: GatewayOptions) -> Result<Gateway> {
    let files_dir = temp_dir("assets");
    std::fs::write(files_dir.join("index.html"), "<h1>peerway</h1>")?;
    std::fs::write(files_dir.join("favicon.ico"), [0u8, 0, 1, 0])?;

    let connector = PeerConnector::new(network, options.connect_timeout);
    let app = router(GatewayState::new(connector, files_dir.clone()));

    let (use_tls, cert_file, key_file) = match options.tls {
        Some((cert, key)) => (true, cert, key),
        None => (false, PathBuf::new(), PathBuf::new()),
    };
    let config = ListenerConfig {
        address: "127.0.0.1:0".to_string(),
        use_tls,
        cert_file,
        key_file,
        read_timeout: options.read_timeout,
        write_timeout: options.write_timeout,
    };

    let handle = Handle::new();
    let server_handle = handle.clone();
    tokio::spawn(async move {
        if let Err(e) = serve_listener(app, config, server_handle).await {
            eprintln!("test gateway failed: {e:#}");
        }
    });

    let addr = wait_listening(&handle).await?;
    Ok(Gateway {
        addr,
        files_dir,
        handle,
    })
}

/// Wait for a server handle to report its bound address.
pub async fn wait_listening(handle: &Handle) -> Result<SocketAddr> {
    match tokio::time::timeout(Duration::from_secs(5), handle.listening()).await {
        Ok(Some(addr)) => Ok(addr),
        Ok(None) => bail!("server exited before listening"),
        Err(_) => bail!("server did not start listening"),
    }
}

/// Plain HTTP client that does not follow redirects.
pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .context("failed to build HTTP client")
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
