//! HTTP server for the listening-test survey
//!
//! Serves the range-aware audio streaming endpoint, the survey JSON API and
//! the raw media files. All routes accept an optional trailing slash.

use std::future::Future;
use std::sync::Arc;

use auralis_core::config::AuralisConfig;
use auralis_core::storage::AssetLibrary;
use auralis_core::streaming::AudioStreamService;
use auralis_core::survey::{SurveyStore, load_questions};
use auralis_core::{AuralisError, CsvExporter, EvaluationExporter, NoopExporter};
use axum::extract::Request;
use axum::routing::{get, post};
use axum::{Router, ServiceExt};
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{
    create_evaluation, create_noise_response, create_user, get_audio, get_question, health,
    list_audios, list_questions, preflight_audio, stream_audio,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuralisConfig>,
    pub library: Arc<AssetLibrary>,
    pub streaming: AudioStreamService,
    pub survey: Arc<SurveyStore>,
    pub exporter: Arc<dyn EvaluationExporter>,
}

impl AppState {
    /// Assemble state from already-built components.
    pub fn new(
        config: AuralisConfig,
        library: Arc<AssetLibrary>,
        survey: Arc<SurveyStore>,
        exporter: Arc<dyn EvaluationExporter>,
    ) -> Self {
        let streaming = AudioStreamService::new(library.clone(), config.streaming.clone());
        Self {
            config: Arc::new(config),
            library,
            streaming,
            survey,
            exporter,
        }
    }

    /// Build state from configuration: scan the media directory, load the
    /// questionnaire and pick the exporter.
    ///
    /// # Errors
    ///
    /// - `AuralisError::Io` - Media directory cannot be read
    /// - `AuralisError::Survey` - Questions file is missing or invalid
    pub async fn from_config(config: AuralisConfig) -> Result<Self, AuralisError> {
        let library = Arc::new(AssetLibrary::scan(&config.storage.media_dir).await?);
        info!(
            "Found {} audio clips in {}",
            library.len().await,
            config.storage.media_dir.display()
        );

        let questions = match &config.storage.questions_path {
            Some(path) => load_questions(path).await?,
            None => {
                warn!("No questions file configured, questionnaire is empty");
                Vec::new()
            }
        };
        info!("Loaded {} questionnaire items", questions.len());

        let survey = Arc::new(SurveyStore::new(questions, library.clone()));

        let exporter: Arc<dyn EvaluationExporter> = if config.export.enabled {
            info!("Exporting evaluations to {}", config.export.csv_path.display());
            Arc::new(CsvExporter::new(&config.export.csv_path))
        } else {
            Arc::new(NoopExporter)
        };

        Ok(Self::new(config, library, survey, exporter))
    }
}

/// Routes without path normalisation.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users", post(create_user))
        .route("/audios", get(list_audios))
        .route("/audios/{id}", get(get_audio))
        .route("/noise-questions", get(list_questions))
        .route("/noise-questions/{id}", get(get_question))
        .route("/noise-responses", post(create_noise_response))
        .route("/evaluations", post(create_evaluation))
        .route("/health", get(health))
        .layer(CorsLayer::permissive());

    // The streaming route sets its own CORS headers and answers OPTIONS itself.
    let mut router = Router::new()
        .route(
            "/stream-audio/{asset_id}",
            get(stream_audio).options(preflight_audio),
        )
        .merge(api);

    if let Some(root) = state.library.root() {
        router = router.nest_service("/media", ServeDir::new(root));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Complete application: routes plus trailing-slash normalisation.
pub fn build_app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state))
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// - `std::io::Error` - Accepting connections failed
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = build_app(state);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Run the server described by `config` until Ctrl-C.
///
/// # Errors
///
/// - `AuralisError::Io` - Media directory unreadable or address unavailable
/// - `AuralisError::Survey` - Questions file is missing or invalid
pub async fn run_server(config: AuralisConfig) -> Result<(), AuralisError> {
    let address = config.server.bind_address();
    let state = AppState::from_config(config).await?;

    let listener = TcpListener::bind(&address).await?;
    info!("Auralis survey server running on http://{}", address);

    serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use auralis_core::storage::test_fixtures::create_media_dir;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt as _;

    use super::*;

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let (temp_dir, media_dir) = create_media_dir(&[("park.wav", 64)]);
        let mut config = AuralisConfig::for_testing();
        config.storage.media_dir = media_dir;
        let state = AppState::from_config(config).await.unwrap();
        (temp_dir, state)
    }

    #[tokio::test]
    async fn test_trailing_slash_is_accepted() {
        let (_dir, state) = test_state().await;

        for uri in ["/audios", "/audios/", "/stream-audio/1/"] {
            let response = build_app(state.clone())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
        }
    }

    #[tokio::test]
    async fn test_non_numeric_asset_id_is_not_found() {
        let (_dir, state) = test_state().await;
        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/stream-audio/park")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_media_files_are_served() {
        let (_dir, state) = test_state().await;
        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/media/park.wav")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_questions_file_fails_startup() {
        let (_temp_dir, media_dir) = create_media_dir(&[]);
        let mut config = AuralisConfig::for_testing();
        config.storage.media_dir = media_dir.clone();
        config.storage.questions_path = Some(media_dir.join("absent.json"));

        let result = AppState::from_config(config).await;
        assert!(matches!(result, Err(AuralisError::Survey(_))));
    }
}
