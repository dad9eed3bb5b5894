//! Landing page and favicon, read from the configured asset directory.

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::error::GatewayError;
use crate::route::StaticAsset;

use super::GatewayState;

pub async fn serve(state: &GatewayState, asset: StaticAsset) -> Result<Response, GatewayError> {
    let path = state.files_dir.join(asset.file_name());

    let data = tokio::fs::read(&path).await.map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "static asset unavailable");
        GatewayError::AssetNotFound
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    Ok(([(CONTENT_TYPE, mime.to_string())], data).into_response())
}
