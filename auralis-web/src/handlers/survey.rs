//! Survey JSON API: registration, questionnaire, clip catalogue and ratings

use std::sync::Arc;

use auralis_core::storage::{Asset, AssetId, AssetResolver};
use auralis_core::survey::SurveyStore;
use auralis_core::survey::models::{
    AudioEvaluation, NewAudioEvaluation, NewNoiseResponse, NewUserProfile, NoiseQuestion,
    NoiseResponse, RecordId, UserProfile,
};
use auralis_core::EvaluationExporter;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::server::AppState;

/// Clip as presented to the survey frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioView {
    pub id: AssetId,
    pub title: String,
    /// Direct download URL of the media file
    pub file: String,
    /// Range-capable streaming URL
    pub stream_url: String,
}

impl AudioView {
    fn from_asset(state: &AppState, asset: &Asset) -> Self {
        let base = state.config.server.base_url();
        Self {
            id: asset.id,
            title: asset.title.clone(),
            file: format!("{}/media/{}", base, state.library.relative_path(asset)),
            stream_url: format!("{}/stream-audio/{}/", base, asset.id),
        }
    }
}

/// Register a participant.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<NewUserProfile>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    let Json(new) = payload?;
    let profile = state.survey.create_user(new).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// All clips in identifier order.
pub async fn list_audios(State(state): State<AppState>) -> Json<Vec<AudioView>> {
    let assets = state.library.assets().await;
    Json(
        assets
            .iter()
            .map(|asset| AudioView::from_asset(&state, asset))
            .collect(),
    )
}

pub async fn get_audio(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AudioView>, ApiError> {
    let id = id.parse::<AssetId>().map_err(|_| ApiError::NotFound("Audio"))?;
    let asset = state
        .library
        .resolve(id)
        .await
        .ok_or(ApiError::NotFound("Audio"))?;
    Ok(Json(AudioView::from_asset(&state, &asset)))
}

pub async fn list_questions(State(state): State<AppState>) -> Json<Vec<NoiseQuestion>> {
    Json(state.survey.questions().to_vec())
}

pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoiseQuestion>, ApiError> {
    id.parse::<RecordId>()
        .ok()
        .and_then(|id| state.survey.question(id))
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound("Question"))
}

/// Record one questionnaire answer.
pub async fn create_noise_response(
    State(state): State<AppState>,
    payload: Result<Json<NewNoiseResponse>, JsonRejection>,
) -> Result<(StatusCode, Json<NoiseResponse>), ApiError> {
    let Json(new) = payload?;
    let response = state.survey.create_response(new).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Record a clip evaluation and queue its export.
///
/// The export runs after the response is sent; its failures are only logged.
pub async fn create_evaluation(
    State(state): State<AppState>,
    payload: Result<Json<NewAudioEvaluation>, JsonRejection>,
) -> Result<(StatusCode, Json<AudioEvaluation>), ApiError> {
    let Json(new) = payload?;
    let evaluation = state.survey.create_evaluation(new).await?;

    tokio::spawn(export_evaluation(
        state.survey.clone(),
        state.exporter.clone(),
        evaluation.user,
        evaluation.audio,
    ));

    Ok((StatusCode::CREATED, Json(evaluation)))
}

async fn export_evaluation(
    survey: Arc<SurveyStore>,
    exporter: Arc<dyn EvaluationExporter>,
    user: RecordId,
    audio: AssetId,
) {
    let row = match survey.export_row(user, audio).await {
        Ok(row) => row,
        Err(e) => {
            warn!("Cannot build export row for user {} audio {}: {}", user, audio, e);
            return;
        }
    };

    match exporter.export(&row).await {
        Ok(()) => debug!("Exported evaluation of audio {} by user {}", audio, user),
        Err(e) => warn!("Export of audio {} by user {} failed: {}", audio, user, e),
    }
}

/// Liveness probe with record counts.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "assets": state.library.len().await,
        "questions": state.survey.questions().len(),
        "participants": state.survey.user_count().await,
    }))
}

#[cfg(test)]
mod tests {
    use auralis_core::config::AuralisConfig;
    use auralis_core::storage::test_fixtures::create_media_dir;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, header};
    use tower::ServiceExt;

    use crate::server::build_app;

    use super::*;

    async fn test_state() -> (tempfile::TempDir, AppState) {
        let (temp_dir, media_dir) = create_media_dir(&[("city/street_night.wav", 32)]);
        let mut config = AuralisConfig::for_testing();
        config.storage.media_dir = media_dir;
        config.server.public_base_url = "http://survey.test/".to_string();
        let state = AppState::from_config(config).await.unwrap();
        (temp_dir, state)
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = build_app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_audio_urls_use_public_base() {
        let (_dir, state) = test_state().await;
        let (status, body) = call(&state, Method::GET, "/audios/1/", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "street night");
        assert_eq!(body["file"], "http://survey.test/media/city/street_night.wav");
        assert_eq!(body["stream_url"], "http://survey.test/stream-audio/1/");
    }

    #[tokio::test]
    async fn test_unknown_records_are_not_found() {
        let (_dir, state) = test_state().await;

        let (status, body) = call(&state, Method::GET, "/audios/9", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Audio not found");

        let (status, _) = call(&state, Method::GET, "/noise-questions/abc", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_registration_rejects_duplicates_and_bad_json() {
        let (_dir, state) = test_state().await;
        let payload = r#"{"user_id": "P001", "age": 31, "gender": "female"}"#;

        let (status, body) = call(&state, Method::POST, "/users/", payload).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["gender"], "female");

        let (status, body) = call(&state, Method::POST, "/users", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User with user_id 'P001' already exists");

        let (status, body) = call(&state, Method::POST, "/users", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn test_evaluation_of_unknown_audio_is_rejected() {
        let (_dir, state) = test_state().await;
        call(&state, Method::POST, "/users", r#"{"user_id": "P002", "age": 40}"#).await;

        let (status, body) = call(
            &state,
            Method::POST,
            "/evaluations",
            r#"{"audio": 42, "user": 1, "calm": 3}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Audio 42 does not exist");
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let (_dir, state) = test_state().await;
        let (status, body) = call(&state, Method::GET, "/health", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["assets"], 1);
        assert_eq!(body["participants"], 0);
    }
}
