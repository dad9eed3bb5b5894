//! peerway-core — identifiers and configuration shared by all peerway crates.

pub mod config;
pub mod identity;

pub use config::{GatewayConfig, ListenerConfig};
pub use identity::{decode_content_hash, ContentHash, NodeId, PeerIdentifier, PublicKey};
