//! Request path → route.
//!
//! Only a fixed set of shapes is accepted:
//!
//!   /  /index.html  /favicon.ico    static assets
//!   /<peer>                         ledger summary of a peer
//!   /<peer>/<hash>                  one file from a peer
//!
//! `<peer>` is a hex node identifier or hex compressed public key, `<hash>` a
//! hex BLAKE3 digest. Static asset names are fixed here and never derived from
//! the path.

use peerway_core::{decode_content_hash, ContentHash, PeerIdentifier};

use crate::error::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticAsset {
    Index,
    Favicon,
}

impl StaticAsset {
    pub fn file_name(&self) -> &'static str {
        match self {
            StaticAsset::Index => "index.html",
            StaticAsset::Favicon => "favicon.ico",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Static(StaticAsset),
    Ledger(PeerIdentifier),
    File {
        peer: PeerIdentifier,
        hash: ContentHash,
    },
}

impl Route {
    pub fn parse(path: &str) -> Result<Route, GatewayError> {
        match path {
            "/" | "/index.html" => return Ok(Route::Static(StaticAsset::Index)),
            "/favicon.ico" => return Ok(Route::Static(StaticAsset::Favicon)),
            _ => {}
        }

        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let segments: Vec<&str> = trimmed.split('/').collect();

        if segments.len() > 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(GatewayError::MalformedPath);
        }

        let peer = PeerIdentifier::resolve(segments[0]);
        if !peer.is_valid() {
            return Err(GatewayError::MalformedIdentifier);
        }

        match segments.get(1) {
            None => Ok(Route::Ledger(peer)),
            Some(hash) => {
                let hash = decode_content_hash(hash).ok_or(GatewayError::MalformedHash)?;
                Ok(Route::File { peer, hash })
            }
        }
    }
}
