//! Audio streaming endpoint

use auralis_core::storage::AssetId;
use auralis_core::streaming::{AudioStreamService, StreamError};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::server::AppState;

/// Stream an audio asset, honouring a single `Range` request.
///
/// Identifiers that are not numeric cannot name an asset and get 404.
/// A `Range` header that is not valid text is treated as absent.
pub async fn stream_audio(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Ok(asset_id) = asset_id.parse::<AssetId>() else {
        debug!("Rejecting non-numeric asset id {:?}", asset_id);
        return StatusCode::NOT_FOUND.into_response();
    };

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    match state.streaming.stream_asset(asset_id, range).await {
        Ok(response) => response,
        Err(e) => {
            match &e {
                StreamError::StorageUnavailable { .. } => error!("{}", e),
                _ => debug!("{}", e),
            }
            e.into_response()
        }
    }
}

/// CORS preflight for the streaming endpoint; answered without looking the
/// asset up.
pub async fn preflight_audio(Path(_asset_id): Path<String>) -> Response {
    AudioStreamService::preflight()
}
