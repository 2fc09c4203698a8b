mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use common::*;
use reputation_analyzer::api::{router, AppState};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

fn app(file: &NamedTempFile, inference: Arc<FakeInference>) -> Router {
    let board = FakeScoreboard::new(&[("Acme", "/company/acme")], "Acme sells anvils.");
    let pipeline = pipeline(test_config(file), inference, board);
    router(Arc::new(AppState { pipeline }))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(body: &str) -> Request<Body> {
    Request::post("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn post_returns_dataset_schema() {
    let file = dataset_file(DATASET);
    let (status, body) = send(
        app(&file, Arc::new(FakeInference::new())),
        post_json(r#"{"company":"acme"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["emotions"]["joy"], 42);
    assert_eq!(body["emotions"]["Love"], 0);
    assert_eq!(
        body["sentiment"],
        json!({"Positive": 70, "Neutral": 20, "Negative": 10})
    );
    assert_eq!(body["insights"]["positive"], "Staff enjoy the culture.");
}

#[tokio::test]
async fn post_without_company_is_400() {
    let file = dataset_file(DATASET);
    for payload in ["{}", r#"{"company":""}"#, "not json"] {
        let (status, body) = send(
            app(&file, Arc::new(FakeInference::new())),
            post_json(payload),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body, json!({"error": "Company name is required"}));
    }
}

#[tokio::test]
async fn post_unknown_company_is_404() {
    let file = dataset_file(DATASET);
    let (status, body) = send(
        app(&file, Arc::new(FakeInference::new())),
        post_json(r#"{"company":"Globex"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "No reviews found for this company"}));
}

#[tokio::test]
async fn post_with_failing_model_is_500() {
    let file = dataset_file(DATASET);
    let inference = Arc::new(FakeInference::failing(
        "j-hartmann/emotion-english-distilroberta-base",
    ));
    let (status, body) = send(app(&file, inference), post_json(r#"{"company":"Acme"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal Server Error"}));
}

#[tokio::test]
async fn get_returns_live_schema() {
    let file = dataset_file(DATASET);
    let request = Request::get("/api/analyze?company=Acme")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&file, Arc::new(FakeInference::new())), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], "Acme");
    assert_eq!(body["description"], "Acme sells anvils.");
    assert_eq!(body["sentiment"][0]["label"], "POSITIVE");
    assert_eq!(body["summary"], "Staff enjoy the culture.");
}

#[tokio::test]
async fn get_without_company_is_400() {
    let file = dataset_file(DATASET);
    let request = Request::get("/api/analyze").body(Body::empty()).unwrap();
    let (status, body) = send(app(&file, Arc::new(FakeInference::new())), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Company name is required"}));
}

#[tokio::test]
async fn get_unknown_company_is_404() {
    let file = dataset_file(DATASET);
    let request = Request::get("/api/analyze?company=Globex")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&file, Arc::new(FakeInference::new())), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Company not found"}));
}

#[tokio::test]
async fn health_is_ok() {
    let file = dataset_file(DATASET);
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(&file, Arc::new(FakeInference::new())), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
