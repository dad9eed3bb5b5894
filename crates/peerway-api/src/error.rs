//! Gateway error taxonomy and its HTTP mapping.
//!
//! Every failure ends the request with one plain-text response. Nothing here
//! is fatal to the listener.

use axum::http::header::{CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    #[error("404 not found")]
    MalformedPath,
    #[error("404 not found")]
    MalformedIdentifier,
    #[error("Invalid file hash.")]
    MalformedHash,
    #[error("Could not connect to remote peer.")]
    PeerUnreachable,
    #[error("File not found.")]
    ContentNotFound,
    #[error("404 not found")]
    AssetNotFound,
    #[error("404 not found")]
    Unrouted,
    #[error("Request timed out.")]
    WriteTimeout,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedHash => StatusCode::BAD_REQUEST,
            GatewayError::WriteTimeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::MalformedPath
            | GatewayError::MalformedIdentifier
            | GatewayError::PeerUnreachable
            | GatewayError::ContentNotFound
            | GatewayError::AssetNotFound
            | GatewayError::Unrouted => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        text_response(self.status(), format!("{self}\n"))
    }
}

/// Plain text response, never sniffed by the browser.
pub fn text_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        body,
    )
        .into_response()
}
