//! /<peer> — ledger summary of a remote peer.

use axum::http::StatusCode;
use axum::response::Response;

use peerway_core::PeerIdentifier;
use peerway_services::ledger_summary;

use crate::error::{text_response, GatewayError};

use super::GatewayState;

pub async fn show(state: &GatewayState, peer: &PeerIdentifier) -> Result<Response, GatewayError> {
    let handle = state
        .connector
        .connect(peer)
        .await
        .map_err(|_| GatewayError::PeerUnreachable)?;

    let summary = ledger_summary(handle.as_ref());
    Ok(text_response(StatusCode::OK, summary.to_string()))
}
