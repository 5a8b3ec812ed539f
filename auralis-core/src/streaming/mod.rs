//! Byte-range audio streaming.
//!
//! Resolves an asset to a file, interprets an optional `Range` header and
//! streams the requested window back with HTTP partial-content framing and
//! the CORS headers browsers need for cross-origin playback.

pub mod audio_stream;
pub mod content_type;
pub mod file_stream;
pub mod range;

use std::path::PathBuf;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

pub use audio_stream::AudioStreamService;
pub use content_type::content_type_for;
pub use file_stream::{PumpOutcome, spawn_file_pump};
pub use range::{ByteRange, ResolvedRange, Unsatisfiable};

use crate::storage::AssetId;

/// Errors raised before any body bytes are produced.
///
/// Failures after the response head has been sent cannot change the status
/// code; they terminate the body stream instead (see [`file_stream`]).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The identifier does not belong to any registered asset
    #[error("Asset {asset_id} not found")]
    AssetNotFound {
        /// Identifier that failed to resolve
        asset_id: AssetId,
    },

    /// The asset is registered but its file cannot be read
    #[error("Storage unavailable for asset {asset_id} at {}: {source}", path.display())]
    StorageUnavailable {
        /// Asset whose file failed
        asset_id: AssetId,
        /// Registered file location
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A well-formed range lies outside the file
    #[error("Range starting at byte {start} not satisfiable for asset {asset_id} of {total_size} bytes")]
    RangeNotSatisfiable {
        /// Asset being streamed
        asset_id: AssetId,
        /// Requested first byte
        start: u64,
        /// Requested last byte, if any
        end: Option<u64>,
        /// Actual file size
        total_size: u64,
    },
}

/// Result type for streaming operations
pub type StreamingResult<T> = Result<T, StreamError>;

impl StreamError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StreamError::AssetNotFound { .. } => StatusCode::NOT_FOUND,
            StreamError::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            StreamError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self {
            StreamError::RangeNotSatisfiable { total_size, .. } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [
                    (
                        header::CONTENT_RANGE,
                        HeaderValue::from_str(&format!("bytes */{total_size}"))
                            .unwrap_or_else(|_| HeaderValue::from_static("bytes */0")),
                    ),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (
                        header::ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static("*"),
                    ),
                    (
                        header::ACCESS_CONTROL_EXPOSE_HEADERS,
                        HeaderValue::from_static(audio_stream::EXPOSED_HEADERS),
                    ),
                ],
            )
                .into_response(),
            other => other.status_code().into_response(),
        }
    }
}
