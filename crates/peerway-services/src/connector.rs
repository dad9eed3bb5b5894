//! Peer connector — turns a resolved identifier into a live peer session.
//!
//! The network backend receives the timeout and is expected to honor it, but
//! the connector enforces the same deadline on its side as well, so a
//! misbehaving backend can never stall a request past it.

use std::sync::Arc;
use std::time::Duration;

use peerway_core::config::DEFAULT_CONNECT_TIMEOUT;
use peerway_core::PeerIdentifier;

use crate::error::ConnectError;
use crate::network::{PeerHandle, PeerNetwork};

#[derive(Clone)]
pub struct PeerConnector {
    network: Arc<dyn PeerNetwork>,
    timeout: Duration,
}

impl PeerConnector {
    pub fn new(network: Arc<dyn PeerNetwork>, timeout: Duration) -> Self {
        Self { network, timeout }
    }

    /// Connector with the default 10 second deadline.
    pub fn with_default_timeout(network: Arc<dyn PeerNetwork>) -> Self {
        Self::new(network, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn connect(&self, id: &PeerIdentifier) -> Result<Box<dyn PeerHandle>, ConnectError> {
        let attempt = match id {
            PeerIdentifier::NodeId(node_id) => self.network.connect_node_id(node_id, self.timeout),
            PeerIdentifier::PublicKey(key) => {
                tracing::debug!(key = %key, node_id = %key.node_id(), "connecting by public key");
                self.network.connect_public_key(key, self.timeout)
            }
            PeerIdentifier::Invalid => return Err(ConnectError::InvalidIdentifier),
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(peer)) => {
                tracing::debug!(peer = %id, node_id = %peer.info().node_id, "peer connected");
                Ok(peer)
            }
            Ok(Err(e)) => {
                tracing::debug!(peer = %id, error = %e, "peer connection failed");
                Err(ConnectError::Unreachable)
            }
            Err(_) => {
                tracing::debug!(peer = %id, timeout = ?self.timeout, "peer connection timed out");
                Err(ConnectError::Unreachable)
            }
        }
    }
}
