//! Shared setup for integration tests

use std::path::PathBuf;

use auralis_core::config::AuralisConfig;
use auralis_core::storage::test_fixtures::create_media_dir;
use auralis_web::AppState;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response};
use tempfile::TempDir;
use tower::ServiceExt;

/// Running application state together with the directory backing it.
pub struct TestApp {
    pub state: AppState,
    pub media_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestApp {
    /// App serving the given clips with default test configuration.
    pub async fn with_clips(clips: &[(&str, usize)]) -> Self {
        Self::configured(clips, |_| {}).await
    }

    /// App serving the given clips after `configure` adjusts the configuration.
    pub async fn configured(
        clips: &[(&str, usize)],
        configure: impl FnOnce(&mut AuralisConfig),
    ) -> Self {
        let (temp_dir, media_dir) = create_media_dir(clips);
        let mut config = AuralisConfig::for_testing();
        config.storage.media_dir = media_dir.clone();
        configure(&mut config);

        let state = AppState::from_config(config).await.unwrap();
        Self {
            state,
            media_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Send one request through the full application.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        auralis_web::build_app(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    /// GET `uri`, optionally with a `Range` header.
    pub async fn get(&self, uri: &str, range: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(range) = range {
            builder = builder.header("range", range);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST a JSON document and decode the JSON reply.
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status().as_u16();
        (status, json_body(response).await)
    }
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Collect and decode a JSON response body.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Header value as text, panicking when absent.
pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
