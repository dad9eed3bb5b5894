//! Plain HTTP → HTTPS redirect for the port 80 listener.

use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

pub fn router() -> Router {
    Router::new().fallback(handle_redirect)
}

pub async fn handle_redirect(headers: HeaderMap, uri: Uri) -> Response {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or_default();
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    let location = format!("https://{host}{path}");
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
}
