//! peerway-services — the request pipeline below HTTP: connecting to peers
//! and streaming their content, plus the network backends that do the
//! actual peer I/O.

pub mod connector;
pub mod error;
pub mod memory;
pub mod network;
pub mod node_api;
pub mod streamer;

pub use connector::PeerConnector;
pub use error::{ConnectError, NetworkError, StreamError};
pub use memory::{MemoryNetwork, MemoryPeer};
pub use network::{FileStream, PeerHandle, PeerInfo, PeerNetwork, StreamWindow};
pub use node_api::NodeApiNetwork;
pub use streamer::{ledger_summary, stream_file, FileTransfer, LedgerSummary};
