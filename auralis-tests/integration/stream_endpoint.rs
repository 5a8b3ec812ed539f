//! Integration tests for the range-aware streaming endpoint

use auralis_core::storage::test_fixtures::clip_bytes;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use tokio::net::TcpListener;

use crate::support::{TestApp, body_bytes, header};

async fn thousand_byte_app() -> TestApp {
    TestApp::with_clips(&[("forest.wav", 1000)]).await
}

#[tokio::test]
async fn test_full_file_without_range() {
    let app = thousand_byte_app().await;
    let response = app.get("/stream-audio/1/", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-length"), "1000");
    assert_eq!(header(&response, "content-type"), "audio/wav");
    assert_eq!(header(&response, "accept-ranges"), "bytes");
    assert_eq!(header(&response, "access-control-allow-origin"), "*");
    assert_eq!(header(&response, "x-content-type-options"), "nosniff");
    assert_eq!(body_bytes(response).await, clip_bytes(1000));
}

#[tokio::test]
async fn test_closed_range_returns_window() {
    let app = thousand_byte_app().await;
    let response = app.get("/stream-audio/1/", Some("bytes=100-199")).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-length"), "100");
    assert_eq!(header(&response, "content-range"), "bytes 100-199/1000");
    assert_eq!(header(&response, "accept-ranges"), "bytes");
    assert_eq!(body_bytes(response).await, clip_bytes(1000)[100..200]);
}

#[tokio::test]
async fn test_open_ended_range_runs_to_end() {
    let app = thousand_byte_app().await;

    let open = app.get("/stream-audio/1", Some("bytes=900-")).await;
    assert_eq!(open.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&open, "content-length"), "100");
    assert_eq!(header(&open, "content-range"), "bytes 900-999/1000");
    let open_body = body_bytes(open).await;

    let closed = app.get("/stream-audio/1", Some("bytes=900-999")).await;
    assert_eq!(body_bytes(closed).await, open_body);
}

#[tokio::test]
async fn test_malformed_ranges_fall_back_to_full_file() {
    let app = thousand_byte_app().await;

    for range in ["items=0-1", "bytes=abc-def", "bytes=-500", "bytes 0-1"] {
        let response = app.get("/stream-audio/1/", Some(range)).await;
        assert_eq!(response.status(), StatusCode::OK, "range {range}");
        assert_eq!(header(&response, "content-length"), "1000");
        assert!(response.headers().get("content-range").is_none());
        assert_eq!(body_bytes(response).await, clip_bytes(1000));
    }
}

#[tokio::test]
async fn test_unsatisfiable_range_is_rejected() {
    let app = thousand_byte_app().await;
    let response = app.get("/stream-audio/1/", Some("bytes=1000-1200")).await;

    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&response, "content-range"), "bytes */1000");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_range_end_past_file_is_clamped() {
    let app = thousand_byte_app().await;
    let response = app.get("/stream-audio/1/", Some("bytes=990-5000")).await;

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&response, "content-range"), "bytes 990-999/1000");
    assert_eq!(body_bytes(response).await.len(), 10);
}

#[tokio::test]
async fn test_unknown_asset_is_not_found() {
    let app = thousand_byte_app().await;

    for uri in ["/stream-audio/99/", "/stream-audio/forest/"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_missing_file_is_server_error() {
    let app = thousand_byte_app().await;
    std::fs::remove_file(app.media_dir.join("forest.wav")).unwrap();

    let response = app.get("/stream-audio/1/", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_head_reports_length_without_body() {
    let app = thousand_byte_app().await;
    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/stream-audio/1/")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-length"), "1000");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_preflight_allows_range_requests() {
    let app = thousand_byte_app().await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/stream-audio/1/")
        .header("origin", "http://player.test")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "range")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let methods = header(&response, "access-control-allow-methods");
    for method in ["GET", "HEAD", "OPTIONS"] {
        assert!(methods.contains(method), "{methods}");
    }
    assert!(header(&response, "access-control-allow-headers").contains("Range"));
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_streams_over_real_connection() {
    let app = TestApp::with_clips(&[("long_take.mp3", 100_000)]).await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(auralis_web::serve(listener, app.state.clone(), async {
        let _ = shutdown_rx.await;
    }));

    let client = reqwest::Client::new();
    let url = format!("http://{address}/stream-audio/1/");

    let full = client.get(&url).send().await.unwrap();
    assert_eq!(full.status().as_u16(), 200);
    assert_eq!(full.content_length(), Some(100_000));
    assert_eq!(full.bytes().await.unwrap().to_vec(), clip_bytes(100_000));

    let partial = client
        .get(&url)
        .header("Range", "bytes=50000-")
        .send()
        .await
        .unwrap();
    assert_eq!(partial.status().as_u16(), 206);
    assert_eq!(
        partial.headers()["content-range"].to_str().unwrap(),
        "bytes 50000-99999/100000"
    );
    assert_eq!(
        partial.bytes().await.unwrap().to_vec(),
        clip_bytes(100_000)[50_000..]
    );

    drop(client);
    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
