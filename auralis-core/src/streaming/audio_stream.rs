//! Range-aware audio streaming service.
//!
//! Answers `GET`/`HEAD` with either the whole file (`200 OK`) or the requested
//! byte window (`206 Partial Content`), and `OPTIONS` with a CORS preflight.
//! Malformed `Range` headers are not rejected: they are served exactly like a
//! request without one.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tracing::{debug, error, info};

use super::content_type::content_type_for;
use super::file_stream::spawn_file_pump;
use super::range::ByteRange;
use super::{StreamError, StreamingResult};
use crate::config::StreamingConfig;
use crate::storage::{AssetId, AssetResolver};

/// Response headers readable by cross-origin scripts.
pub const EXPOSED_HEADERS: &str = "Content-Length, Content-Range, Accept-Ranges";
/// Methods advertised to preflight requests.
pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
/// Request headers advertised to preflight requests.
pub const ALLOWED_HEADERS: &str = "Range, Content-Type";

/// Streams registered audio assets over HTTP.
///
/// Holds no per-request state; every call opens its own file handle, so any
/// number of streams can run concurrently.
#[derive(Clone)]
pub struct AudioStreamService {
    resolver: Arc<dyn AssetResolver>,
    config: StreamingConfig,
}

impl AudioStreamService {
    /// Creates a service reading assets through `resolver`.
    pub fn new(resolver: Arc<dyn AssetResolver>, config: StreamingConfig) -> Self {
        Self { resolver, config }
    }

    /// Streams an asset, honouring an optional raw `Range` header value.
    ///
    /// A header matching `bytes=<start>-<end?>` yields `206` with exactly the
    /// requested window (end clamped to the last byte); anything else yields
    /// `200` with the whole file. The body is read lazily in
    /// `chunk_size` pieces.
    ///
    /// # Errors
    ///
    /// - `StreamError::AssetNotFound` - Identifier is not registered
    /// - `StreamError::StorageUnavailable` - File cannot be opened, inspected or positioned
    /// - `StreamError::RangeNotSatisfiable` - Range starts past the end of the file or ends before it starts
    pub async fn stream_asset(
        &self,
        asset_id: AssetId,
        range_header: Option<&str>,
    ) -> StreamingResult<Response> {
        let asset = self
            .resolver
            .resolve(asset_id)
            .await
            .ok_or(StreamError::AssetNotFound { asset_id })?;

        let storage_error = |source: std::io::Error| StreamError::StorageUnavailable {
            asset_id,
            path: asset.file_path.clone(),
            source,
        };

        let mut file = File::open(&asset.file_path).await.map_err(storage_error)?;
        let metadata = file.metadata().await.map_err(storage_error)?;
        if !metadata.is_file() {
            return Err(storage_error(std::io::Error::other("not a regular file")));
        }
        let total_size = metadata.len();
        let content_type = content_type_for(&asset.file_path);

        let requested = range_header.and_then(|raw| {
            let parsed = ByteRange::parse(raw);
            if parsed.is_none() {
                debug!(
                    "Ignoring malformed Range header {:?} for asset {}, serving full file",
                    raw, asset_id
                );
            }
            parsed
        });

        let builder = Response::builder()
            .header(header::CONTENT_TYPE, content_type)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(header::ACCESS_CONTROL_EXPOSE_HEADERS, EXPOSED_HEADERS)
            .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");

        let (builder, start, length) = match requested {
            Some(range) => {
                let window =
                    range
                        .resolve(total_size)
                        .map_err(|u| StreamError::RangeNotSatisfiable {
                            asset_id,
                            start: u.start,
                            end: u.end,
                            total_size: u.total_size,
                        })?;

                info!(
                    "Streaming asset {} ({}): {}",
                    asset_id,
                    asset.title,
                    window.content_range()
                );

                let builder = builder
                    .status(StatusCode::PARTIAL_CONTENT)
                    .header(header::CONTENT_LENGTH, window.length().to_string())
                    .header(header::CONTENT_RANGE, window.content_range());
                (builder, window.start, window.length())
            }
            None => {
                info!(
                    "Streaming asset {} ({}): full file, {} bytes",
                    asset_id, asset.title, total_size
                );

                let builder = builder
                    .status(StatusCode::OK)
                    .header(header::CONTENT_LENGTH, total_size.to_string());
                (builder, 0, total_size)
            }
        };

        if start > 0 {
            file.seek(std::io::SeekFrom::Start(start))
                .await
                .map_err(storage_error)?;
        }

        let (stream, _pump) = spawn_file_pump(file, length, &self.config, asset_id.to_string());

        Ok(builder.body(Body::from_stream(stream)).unwrap_or_else(|e| {
            error!("Failed to build stream response for asset {}: {}", asset_id, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }))
    }

    /// Answers a CORS preflight for the streaming endpoint.
    ///
    /// The asset is not looked up; browsers only need the permission headers.
    pub fn preflight() -> Response {
        (
            StatusCode::NO_CONTENT,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
                (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS),
                (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS),
            ],
        )
            .into_response()
    }
}
