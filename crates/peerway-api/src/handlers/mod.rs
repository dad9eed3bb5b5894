//! Gateway request handlers.
//!
//! A single fallback handler receives every request, percent-decodes its
//! path, classifies it with [`Route::parse`], and hands off to the matching
//! handler. Each request is independent; nothing is remembered between
//! requests.

pub mod file;
pub mod ledger;
pub mod redirect;
pub mod static_files;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use peerway_services::PeerConnector;

use crate::error::GatewayError;
use crate::listener::WriteDeadline;
use crate::route::Route;

#[derive(Clone)]
pub struct GatewayState {
    pub connector: PeerConnector,
    /// Directory holding index.html and favicon.ico.
    pub files_dir: Arc<PathBuf>,
}

impl GatewayState {
    pub fn new(connector: PeerConnector, files_dir: impl Into<PathBuf>) -> Self {
        Self {
            connector,
            files_dir: Arc::new(files_dir.into()),
        }
    }
}

pub async fn handle_gateway(State(state): State<GatewayState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    if parts.method != Method::GET {
        return GatewayError::Unrouted.into_response();
    }

    let deadline = parts.extensions.get::<WriteDeadline>().map(|d| d.0);
    let route = match percent_decode_str(parts.uri.path()).decode_utf8() {
        Ok(path) => Route::parse(&path),
        Err(_) => Err(GatewayError::MalformedPath),
    };

    let result = match route {
        Ok(Route::Static(asset)) => static_files::serve(&state, asset).await,
        Ok(Route::Ledger(peer)) => ledger::show(&state, &peer).await,
        Ok(Route::File { peer, hash }) => file::show(&state, &peer, &hash, deadline).await,
        Err(e) => Err(e),
    };

    result.into_response()
}
