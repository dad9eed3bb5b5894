//! Peer and content identifiers as they appear in gateway URLs.
//!
//! Two encodings reach the gateway as hex path segments:
//!   1. BLAKE3 digests (32 bytes) — node identifiers and content hashes
//!   2. compressed secp256k1 public keys (33 bytes) — an alternative way to
//!      address a peer whose node identifier is not known in advance
//!
//! Nothing here touches the network. Decoding is pure and total: every input
//! maps to a value or to "not decodable".

use std::fmt;

use thiserror::Error;

/// Size of a BLAKE3 digest in bytes.
pub const HASH_SIZE: usize = 32;

/// Size of a compressed secp256k1 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 33;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid hex")]
    InvalidHex,
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("not a valid compressed public key")]
    InvalidPublicKey,
}

/// Decode a hex string into exactly `N` bytes.
fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], IdentityError> {
    let bytes = hex::decode(text).map_err(|_| IdentityError::InvalidHex)?;
    if bytes.len() != N {
        return Err(IdentityError::WrongLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ── Digests ───────────────────────────────────────────────────────────────────

/// Routing identifier of a peer: BLAKE3 of its compressed public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub [u8; HASH_SIZE]);

impl NodeId {
    pub fn from_hex(text: &str) -> Result<Self, IdentityError> {
        decode_fixed(text).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// BLAKE3 digest addressing one file in a peer's content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; HASH_SIZE]);

impl ContentHash {
    pub fn from_hex(text: &str) -> Result<Self, IdentityError> {
        decode_fixed(text).map(Self)
    }

    /// Hash file content the way the network addresses it.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Decode a content hash from a URL segment.
///
/// Returns `None` if the text is not hex or not exactly [`HASH_SIZE`] bytes.
pub fn decode_content_hash(text: &str) -> Option<ContentHash> {
    ContentHash::from_hex(text).ok()
}

// ── Public keys ───────────────────────────────────────────────────────────────

/// Compressed secp256k1 public key of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    /// Parse a hex-encoded compressed key. Uncompressed (65 byte) encodings
    /// are rejected; URLs always carry the compressed form.
    pub fn from_hex(text: &str) -> Result<Self, IdentityError> {
        let bytes: [u8; PUBLIC_KEY_SIZE] = decode_fixed(text)?;
        secp256k1::PublicKey::from_slice(&bytes)
            .map(Self)
            .map_err(|_| IdentityError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.serialize()
    }

    /// Node identifier this key is routed under.
    pub fn node_id(&self) -> NodeId {
        NodeId(*blake3::hash(&self.to_bytes()).as_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

// ── PeerIdentifier ────────────────────────────────────────────────────────────

/// How a request addresses its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerIdentifier {
    NodeId(NodeId),
    PublicKey(PublicKey),
    Invalid,
}

impl PeerIdentifier {
    /// Resolve a URL segment. Node identifiers are tried first since most
    /// links reference a node; the public key form is the fallback.
    pub fn resolve(text: &str) -> Self {
        if let Ok(id) = NodeId::from_hex(text) {
            return PeerIdentifier::NodeId(id);
        }
        match PublicKey::from_hex(text) {
            Ok(key) => PeerIdentifier::PublicKey(key),
            Err(_) => PeerIdentifier::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, PeerIdentifier::Invalid)
    }
}

impl fmt::Display for PeerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerIdentifier::NodeId(id) => write!(f, "node:{}", id),
            PeerIdentifier::PublicKey(key) => write!(f, "key:{}", key),
            PeerIdentifier::Invalid => f.write_str("invalid"),
        }
    }
}
