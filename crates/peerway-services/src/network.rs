//! Collaborator contract — what the gateway needs from the P2P network.
//!
//! The gateway never discovers, routes to, or authenticates peers itself.
//! It asks a `PeerNetwork` for a session with one peer, reads that peer's
//! metadata, and optionally opens a file cursor on it. Everything below this
//! trait boundary belongs to the network stack.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use peerway_core::{ContentHash, NodeId, PublicKey};

use crate::error::NetworkError;

/// Metadata a connected peer advertises about itself and its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub node_id: NodeId,
    pub blockchain_height: u64,
    pub blockchain_version: u64,
    pub user_agent: String,
}

/// Byte range of a file transfer.
///
/// `limit == 0` means "until the transfer size the peer reports".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamWindow {
    pub offset: u64,
    pub limit: u64,
}

impl StreamWindow {
    /// The whole file.
    pub const FULL: StreamWindow = StreamWindow {
        offset: 0,
        limit: 0,
    };
}

/// Upstream reader. Dropping it releases the cursor on the remote peer.
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// An open read cursor on a remote file.
pub struct FileStream {
    pub reader: FileReader,
    /// Total size of the file on the peer.
    pub file_size: u64,
    /// Bytes the peer commits to deliver for the requested window.
    pub transfer_size: u64,
}

impl std::fmt::Debug for FileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStream")
            .field("file_size", &self.file_size)
            .field("transfer_size", &self.transfer_size)
            .finish_non_exhaustive()
    }
}

/// A live session with one remote peer.
///
/// Owned by exactly one request. Dropping the handle ends the session.
#[async_trait]
pub trait PeerHandle: Send + Sync {
    fn info(&self) -> &PeerInfo;

    /// Open a read cursor for `hash`. `Ok(None)` means the peer answered but
    /// produced no stream.
    ///
    /// `cancel` fires when the requesting client goes away; implementations
    /// should abort any outstanding work on the peer when it does.
    async fn open_file(
        &self,
        hash: &ContentHash,
        window: StreamWindow,
        cancel: CancellationToken,
    ) -> Result<Option<FileStream>, NetworkError>;
}

/// Entry points into the P2P network.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Connect to a peer by its routing identifier.
    async fn connect_node_id(
        &self,
        node_id: &NodeId,
        timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError>;

    /// Connect to a peer by its public key.
    async fn connect_public_key(
        &self,
        key: &PublicKey,
        timeout: Duration,
    ) -> Result<Box<dyn PeerHandle>, NetworkError>;
}
