//! In-process network backend.
//!
//! Peers and their files live in memory. Used by tests and by anything that
//! wants to run the gateway without a peer node. Counters record every
//! connect, stream open and stream release so tests can assert on resource
//! handling.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use peerway_core::identity::PUBLIC_KEY_SIZE;
use peerway_core::{ContentHash, NodeId, PublicKey};

use crate::error::NetworkError;
use crate::network::{FileStream, PeerHandle, PeerInfo, PeerNetwork, StreamWindow};

/// A peer known to the in-memory network.
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    info: PeerInfo,
    public_key: Option<PublicKey>,
    files: HashMap<ContentHash, Bytes>,
    empty_streams: HashSet<ContentHash>,
    size_overrides: HashMap<ContentHash, u64>,
    connect_delay: Option<Duration>,
    refuse: bool,
    stall_after: Option<usize>,
}

impl MemoryPeer {
    pub fn new(node_id: NodeId, height: u64, version: u64, user_agent: &str) -> Self {
        Self {
            info: PeerInfo {
                node_id,
                blockchain_height: height,
                blockchain_version: version,
                user_agent: user_agent.to_string(),
            },
            public_key: None,
            files: HashMap::new(),
            empty_streams: HashSet::new(),
            size_overrides: HashMap::new(),
            connect_delay: None,
            refuse: false,
            stall_after: None,
        }
    }

    /// Make the peer reachable by public key as well.
    pub fn with_public_key(mut self, key: PublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    /// Store a file under its BLAKE3 hash.
    pub fn with_file(mut self, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        self.files.insert(ContentHash::of(&data), data);
        self
    }

    /// Answer opens for `hash` with no stream and no error.
    pub fn with_empty_stream(mut self, hash: ContentHash) -> Self {
        self.empty_streams.insert(hash);
        self
    }

    /// Report `size` as the transfer size for `hash` regardless of content.
    pub fn with_transfer_size_override(mut self, hash: ContentHash, size: u64) -> Self {
        self.size_overrides.insert(hash, size);
        self
    }

    /// Delay connection attempts. The delay ignores the caller's timeout.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Readers deliver `n` bytes and then block until cancelled.
    pub fn with_stall_after(mut self, n: usize) -> Self {
        self.stall_after = Some(n);
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    connects_node_id: AtomicUsize,
    connects_public_key: AtomicUsize,
    sessions_open: AtomicUsize,
    streams_opened: AtomicUsize,
    streams_closed: AtomicUsize,
}

#[derive(Debug, Default)]
pub struct MemoryNetwork {
    peers: DashMap<NodeId, MemoryPeer>,
    keys: DashMap<[u8; PUBLIC_KEY_SIZE], NodeId>,
    counters: Arc<Counters>,
}

impl MemoryNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_peer(&self, peer: MemoryPeer) {
        if let Some(key) = peer.public_key {
            self.keys.insert(key.to_bytes(), peer.info.node_id);
        }
        self.peers.insert(peer.info.node_id, peer);
    }

    pub fn connects_by_node_id(&self) -> usize {
        self.counters.connects_node_id.load(Ordering::SeqCst)
    }

    pub fn connects_by_public_key(&self) -> usize {
        self.counters.connects_public_key.load(Ordering::SeqCst)
    }

    /// Sessions handed out and not yet dropped.
    pub fn sessions_open(&self) -> usize {
        self.counters.sessions_open.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> usize {
        self.counters.streams_opened.load(Ordering::SeqCst)
    }

    pub fn streams_closed(&self) -> usize {
        self.counters.streams_closed.load(Ordering::SeqCst)
    }

    async fn session(&self, node_id: &NodeId) -> Result<Box<dyn PeerHandle>, NetworkError> {
        let peer = self
            .peers
            .get(node_id)
            .map(|p| p.value().clone())
            .ok_or(NetworkError::PeerNotFound)?;

        if let Some(delay) = peer.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if peer.refuse {
            return Err(NetworkError::Refused);
        }

        self.counters.sessions_open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            peer,
            counters: self.counters.clone(),
        }))
    }
}

#[async_trait]
impl PeerNetwork for MemoryNetwork {
    async fn connect_node_id(
        &self,
        node_id: &NodeId,
        _timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError> {
        self.counters.connects_node_id.fetch_add(1, Ordering::SeqCst);
        self.session(node_id).await
    }

    async fn connect_public_key(
        &self,
        key: &PublicKey,
        _timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError> {
        self.counters
            .connects_public_key
            .fetch_add(1, Ordering::SeqCst);
        let node_id = self
            .keys
            .get(&key.to_bytes())
            .map(|e| *e.value())
            .ok_or(NetworkError::PeerNotFound)?;
        self.session(&node_id).await
    }
}

struct MemorySession {
    peer: MemoryPeer,
    counters: Arc<Counters>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.counters.sessions_open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerHandle for MemorySession {
    fn info(&self) -> &PeerInfo {
        &self.peer.info
    }

    async fn open_file(
        &self,
        hash: &ContentHash,
        window: StreamWindow,
        cancel: CancellationToken,
    ) -> Result<Option<FileStream>, NetworkError> {
        if cancel.is_cancelled() {
            return Err(NetworkError::Cancelled);
        }
        if self.peer.empty_streams.contains(hash) {
            return Ok(None);
        }
        let data = self
            .peer
            .files
            .get(hash)
            .ok_or_else(|| NetworkError::Backend(format!("unknown hash {hash}")))?;

        let file_size = data.len() as u64;
        let start = window.offset.min(file_size);
        let end = if window.limit == 0 {
            file_size
        } else {
            start.saturating_add(window.limit).min(file_size)
        };
        let transfer_size = self
            .peer
            .size_overrides
            .get(hash)
            .copied()
            .unwrap_or(end - start);

        self.counters.streams_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Some(FileStream {
            reader: Box::new(MemoryReader {
                data: data.slice(start as usize..),
                pos: 0,
                stall_after: self.peer.stall_after,
                cancelled: Box::pin(cancel.cancelled_owned()),
                counters: self.counters.clone(),
            }),
            file_size,
            transfer_size,
        }))
    }
}

struct MemoryReader {
    data: Bytes,
    pos: usize,
    stall_after: Option<usize>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    counters: Arc<Counters>,
}

impl AsyncRead for MemoryReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "transfer cancelled",
            )));
        }

        let available = match this.stall_after {
            Some(n) => n.min(this.data.len()),
            None => this.data.len(),
        };
        if this.pos >= available {
            if available < this.data.len() {
                // stalled; woken by cancellation
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        let n = (available - this.pos).min(buf.remaining());
        buf.put_slice(&this.data[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.counters.streams_closed.fetch_add(1, Ordering::SeqCst);
    }
}
