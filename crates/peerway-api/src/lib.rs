//! peerway-api — the public HTTP surface of the gateway.
//!
//! Every request lands on one fallback handler; see [`route`] for the
//! accepted path shapes and [`listener`] for TLS and timeouts.

pub mod error;
pub mod handlers;
pub mod listener;
pub mod route;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handlers::GatewayState;
pub use listener::{serve_listener, serve_redirect, with_write_timeout, WriteDeadline};
pub use route::{Route, StaticAsset};

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .fallback(handlers::handle_gateway)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
