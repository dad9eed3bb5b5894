//! /<peer>/<hash> — raw bytes of one file, streamed from the peer.

use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use peerway_core::{ContentHash, PeerIdentifier};
use peerway_services::{stream_file, StreamWindow};

use crate::error::GatewayError;

use super::GatewayState;

pub async fn show(
    state: &GatewayState,
    peer: &PeerIdentifier,
    hash: &ContentHash,
    deadline: Option<Instant>,
) -> Result<Response, GatewayError> {
    let handle = state
        .connector
        .connect(peer)
        .await
        .map_err(|_| GatewayError::PeerUnreachable)?;

    // Range requests are not supported yet; always the whole file.
    let mut transfer = stream_file(handle, hash, StreamWindow::FULL, CancellationToken::new())
        .await
        .map_err(|_| GatewayError::ContentNotFound)?;

    if let Some(deadline) = deadline {
        transfer = transfer.with_deadline(deadline);
    }

    let transfer_size = transfer.transfer_size();
    tracing::info!(hash = %hash, peer = %peer, bytes = transfer_size, "serving file");

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_LENGTH, transfer_size.to_string()),
        ],
        Body::from_stream(transfer),
    )
        .into_response())
}
