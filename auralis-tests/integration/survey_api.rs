//! Integration tests for the survey API and evaluation export

use std::path::Path;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tempfile::TempDir;

use crate::support::{TestApp, json_body};

const QUESTIONS: &str = r#"[
    {"number": 2, "text": "I get used to most noises without much difficulty.", "reverse_scale": true},
    {"number": 1, "text": "I am easily awakened by noise."}
]"#;

async fn survey_app(workdir: &TempDir) -> TestApp {
    let questions = workdir.path().join("questions.json");
    std::fs::write(&questions, QUESTIONS).unwrap();
    let csv = workdir.path().join("csv").join("user_survey_analysis.csv");

    TestApp::configured(&[("birds.wav", 16), ("traffic.mp3", 16)], |config| {
        config.storage.questions_path = Some(questions);
        config.export.enabled = true;
        config.export.csv_path = csv;
    })
    .await
}

async fn wait_for_lines(path: &Path, expected: usize) -> Vec<String> {
    for _ in 0..100 {
        if let Ok(text) = tokio::fs::read_to_string(path).await {
            let lines: Vec<String> = text.lines().map(str::to_string).collect();
            if lines.len() == expected {
                return lines;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never reached {expected} lines", path.display());
}

#[tokio::test]
async fn test_questionnaire_is_listed_by_number() {
    let workdir = TempDir::new().unwrap();
    let app = survey_app(&workdir).await;

    let response = app.get("/noise-questions/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let questions = json_body(response).await;

    assert_eq!(questions[0]["number"], 1);
    assert_eq!(questions[0]["id"], 2);
    assert_eq!(questions[0]["reverse_scale"], false);
    assert_eq!(questions[1]["number"], 2);
    assert_eq!(questions[1]["reverse_scale"], true);

    let response = app.get("/noise-questions/2", None).await;
    assert_eq!(json_body(response).await["number"], 1);
}

#[tokio::test]
async fn test_audio_catalogue_links_to_stream() {
    let workdir = TempDir::new().unwrap();
    let app = survey_app(&workdir).await;

    let audios = json_body(app.get("/audios", None).await).await;
    let audios = audios.as_array().unwrap();
    assert_eq!(audios.len(), 2);
    assert_eq!(audios[0]["title"], "birds");
    assert_eq!(audios[1]["title"], "traffic");

    let stream_url = audios[1]["stream_url"].as_str().unwrap();
    let path = stream_url.strip_prefix("http://127.0.0.1:8000").unwrap();
    let response = app.get(path, Some("bytes=0-3")).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
}

#[tokio::test]
async fn test_answers_are_validated() {
    let workdir = TempDir::new().unwrap();
    let app = survey_app(&workdir).await;
    let (_, user) = app
        .post_json("/users/", json!({"user_id": "P010", "age": 27}))
        .await;
    assert_eq!(user["gender"], "male");

    let (status, body) = app
        .post_json(
            "/noise-responses/",
            json!({"user": user["id"], "question": 1, "rating": 7}),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("rating"));

    let (status, _) = app
        .post_json(
            "/noise-responses/",
            json!({"user": 99, "question": 1, "rating": 3}),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = app
        .post_json(
            "/evaluations/",
            json!({"audio": 1, "user": user["id"], "traffic_noise": 5}),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("traffic_noise"));
}

#[tokio::test]
async fn test_evaluation_flow_exports_one_row_per_user_and_clip() {
    let workdir = TempDir::new().unwrap();
    let app = survey_app(&workdir).await;
    let csv = workdir.path().join("csv").join("user_survey_analysis.csv");

    let (status, user) = app
        .post_json(
            "/users/",
            json!({"user_id": "P001", "age": 34, "gender": "other"}),
        )
        .await;
    assert_eq!(status, 201);

    // Question with number 1 has primary key 2.
    let (status, _) = app
        .post_json(
            "/noise-responses/",
            json!({"user": user["id"], "question": 2, "rating": 4}),
        )
        .await;
    assert_eq!(status, 201);

    let (status, evaluation) = app
        .post_json(
            "/evaluations/",
            json!({"audio": 2, "user": user["id"], "calm": 10, "human_sounds": 2}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(evaluation["calm"], 10);
    assert_eq!(evaluation["annoyance"], 0);
    assert!(evaluation["submitted_at"].is_string());

    let lines = wait_for_lines(&csv, 2).await;
    assert!(lines[0].starts_with(
        "UserID,AudioTitle,Age,Gender,Q1,Q2,Annoyance,Eventfulness,Pleasantness,Chaotic,Vibrant,Uneventful,Calm,Monotonous,TrafficNoise,OtherNoise,HumanSounds,NaturalSounds,SubmittedAt"
    ));
    assert!(lines[1].starts_with("P001,traffic,34,other,4,,0,0,0,0,0,0,10,0,0,0,2,0,"));

    // Re-rating the same clip replaces the row.
    let (status, _) = app
        .post_json(
            "/evaluations/",
            json!({"audio": 2, "user": user["id"], "calm": 60}),
        )
        .await;
    assert_eq!(status, 201);

    let mut replaced = false;
    for _ in 0..100 {
        let lines = wait_for_lines(&csv, 2).await;
        if lines[1].contains(",60,") {
            replaced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(replaced, "export row was not replaced");

    // A different clip adds a row.
    app.post_json("/evaluations/", json!({"audio": 1, "user": user["id"]}))
        .await;
    let lines = wait_for_lines(&csv, 3).await;
    assert!(lines[2].starts_with("P001,birds,"));
}

#[tokio::test]
async fn test_api_allows_cross_origin_requests() {
    let workdir = TempDir::new().unwrap();
    let app = survey_app(&workdir).await;

    let request = axum::http::Request::builder()
        .uri("/audios/")
        .header("origin", "http://frontend.test")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
