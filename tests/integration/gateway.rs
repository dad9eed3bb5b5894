use std::time::{Duration, Instant};

use peerway_core::{ContentHash, NodeId, PublicKey};
use peerway_services::{MemoryNetwork, MemoryPeer};

use crate::*;

const PEER: NodeId = NodeId([0x5a; 32]);
const GENERATOR_KEY: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn sample_file(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

// ── Static assets ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn landing_page_and_favicon() -> Result<()> {
    let gateway = start_gateway(MemoryNetwork::new(), GatewayOptions::default()).await?;
    let client = client()?;

    let root = client.get(gateway.url("/")).send().await?;
    assert_eq!(root.status(), 200);
    assert_eq!(root.headers()["content-type"], "text/html");
    assert_eq!(root.text().await?, "<h1>peerway</h1>");

    let index = client.get(gateway.url("/index.html")).send().await?;
    assert_eq!(index.text().await?, "<h1>peerway</h1>");

    let favicon = client.get(gateway.url("/favicon.ico")).send().await?;
    assert_eq!(favicon.status(), 200);
    assert_eq!(favicon.bytes().await?.as_ref(), &[0u8, 0, 1, 0]);
    Ok(())
}

#[tokio::test]
async fn asset_names_are_not_taken_from_the_path() -> Result<()> {
    let gateway = start_gateway(MemoryNetwork::new(), GatewayOptions::default()).await?;
    let client = client()?;

    for path in ["/index.htm", "/html/index.html", "/a/b/c"] {
        let response = client.get(gateway.url(path)).send().await?;
        assert_eq!(response.status(), 404, "path {path}");
    }
    Ok(())
}

// ── Ledger queries ────────────────────────────────────────────────────────────

#[tokio::test]
async fn ledger_summary_over_http() -> Result<()> {
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(PEER, 42, 3, "test/1.0"));
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let response = client()?.get(gateway.url(&format!("/{PEER}"))).send().await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(
        response.text().await?,
        format!("Peer {PEER} blockchain height 42 version 3\nUser Agent: test/1.0\n")
    );
    assert!(eventually(|| network.sessions_open() == 0).await);
    Ok(())
}

#[tokio::test]
async fn public_key_resolves_to_its_node() -> Result<()> {
    let key = PublicKey::from_hex(GENERATOR_KEY)?;
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(key.node_id(), 9, 2, "keyed").with_public_key(key));
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let response = client()?
        .get(gateway.url(&format!("/{GENERATOR_KEY}/")))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert!(response.text().await?.starts_with(&format!("Peer {}", key.node_id())));
    assert_eq!(network.connects_by_public_key(), 1);
    Ok(())
}

#[tokio::test]
async fn slow_peer_times_out_with_404() -> Result<()> {
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(PEER, 1, 1, "slow").with_connect_delay(Duration::from_secs(30)));
    let options = GatewayOptions {
        connect_timeout: Duration::from_millis(200),
        ..GatewayOptions::default()
    };
    let gateway = start_gateway(network, options).await?;

    let started = Instant::now();
    let response = client()?.get(gateway.url(&format!("/{PEER}"))).send().await?;
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await?, "Could not connect to remote peer.\n");
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}

#[tokio::test]
async fn unknown_peer_is_404() -> Result<()> {
    let gateway = start_gateway(MemoryNetwork::new(), GatewayOptions::default()).await?;
    let response = client()?.get(gateway.url(&format!("/{PEER}"))).send().await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn unknown_public_key_is_404() -> Result<()> {
    let network = MemoryNetwork::new();
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;
    let client = client()?;
    let hash = ContentHash([0x07; 32]);

    for path in [format!("/{GENERATOR_KEY}"), format!("/{GENERATOR_KEY}/{hash}")] {
        let response = client.get(gateway.url(&path)).send().await?;
        assert_eq!(response.status(), 404, "path {path}");
        assert_eq!(response.text().await?, "Could not connect to remote peer.\n");
    }
    assert_eq!(network.connects_by_public_key(), 2);
    assert_eq!(network.streams_opened(), 0);
    Ok(())
}

// ── File queries ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn file_download_matches_content() -> Result<()> {
    let data = sample_file(3 * 1024 * 1024 + 17);
    let hash = ContentHash::of(&data);
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(PEER, 1, 1, "files").with_file(data.clone()));
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let response = client()?
        .get(gateway.url(&format!("/{PEER}/{hash}")))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "application/octet-stream");
    assert_eq!(response.content_length(), Some(data.len() as u64));

    let body = response.bytes().await?;
    assert_eq!(body.len(), data.len());
    assert!(body.as_ref() == data.as_slice());

    assert!(eventually(|| network.streams_closed() == 1).await);
    assert!(eventually(|| network.sessions_open() == 0).await);
    Ok(())
}

#[tokio::test]
async fn transfer_size_caps_the_body() -> Result<()> {
    let data = sample_file(10_000);
    let hash = ContentHash::of(&data);
    let network = MemoryNetwork::new();
    network.add_peer(
        MemoryPeer::new(PEER, 1, 1, "files")
            .with_file(data.clone())
            .with_transfer_size_override(hash, 4_000),
    );
    let gateway = start_gateway(network, GatewayOptions::default()).await?;

    let response = client()?
        .get(gateway.url(&format!("/{PEER}/{hash}")))
        .send()
        .await?;
    assert_eq!(response.content_length(), Some(4_000));
    let body = response.bytes().await?;
    assert_eq!(body.as_ref(), &data[..4_000]);
    Ok(())
}

#[tokio::test]
async fn invalid_hash_is_400() -> Result<()> {
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(PEER, 1, 1, "files"));
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let response = client()?
        .get(gateway.url(&format!("/{PEER}/not-a-hash")))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    assert_eq!(response.text().await?, "Invalid file hash.\n");
    assert_eq!(network.connects_by_node_id(), 0);
    Ok(())
}

#[tokio::test]
async fn missing_file_is_404() -> Result<()> {
    let network = MemoryNetwork::new();
    network.add_peer(MemoryPeer::new(PEER, 1, 1, "files"));
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let hash = ContentHash([0x01; 32]);
    let response = client()?
        .get(gateway.url(&format!("/{PEER}/{hash}")))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    assert_eq!(response.text().await?, "File not found.\n");
    assert!(eventually(|| network.sessions_open() == 0).await);
    Ok(())
}

#[tokio::test]
async fn client_disconnect_releases_the_stream() -> Result<()> {
    let data = sample_file(4 * 1024 * 1024);
    let hash = ContentHash::of(&data);
    let network = MemoryNetwork::new();
    network.add_peer(
        MemoryPeer::new(PEER, 1, 1, "files")
            .with_file(data)
            .with_stall_after(128 * 1024),
    );
    let gateway = start_gateway(network.clone(), GatewayOptions::default()).await?;

    let mut response = client()?
        .get(gateway.url(&format!("/{PEER}/{hash}")))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert!(response.chunk().await?.is_some());
    drop(response);

    assert!(eventually(|| network.streams_closed() == 1).await);
    assert!(eventually(|| network.sessions_open() == 0).await);
    Ok(())
}

#[tokio::test]
async fn write_timeout_truncates_a_stalled_transfer() -> Result<()> {
    let data = sample_file(1024 * 1024);
    let hash = ContentHash::of(&data);
    let network = MemoryNetwork::new();
    network.add_peer(
        MemoryPeer::new(PEER, 1, 1, "files")
            .with_file(data.clone())
            .with_stall_after(64 * 1024),
    );
    let options = GatewayOptions {
        write_timeout: Duration::from_millis(500),
        ..GatewayOptions::default()
    };
    let gateway = start_gateway(network.clone(), options).await?;

    let response = client()?
        .get(gateway.url(&format!("/{PEER}/{hash}")))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.content_length(), Some(data.len() as u64));

    let result = tokio::time::timeout(Duration::from_secs(10), response.bytes()).await?;
    assert!(result.is_err(), "truncated body must not read as complete");

    assert!(eventually(|| network.streams_closed() == 1).await);
    Ok(())
}

// ── Listener timeouts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn read_timeout_closes_a_stalled_request() -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let options = GatewayOptions {
        read_timeout: Duration::from_millis(200),
        ..GatewayOptions::default()
    };
    let gateway = start_gateway(MemoryNetwork::new(), options).await?;

    let mut stream = tokio::net::TcpStream::connect(gateway.addr).await?;
    stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\n").await?;

    // headers never finish; the server must hang up on its own
    let mut buf = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf)).await;
    assert!(read.is_ok(), "connection still open after the read timeout");
    assert!(!String::from_utf8_lossy(&buf).contains("200 OK"));
    Ok(())
}
