//! End-to-end checks against the real HuggingFace-hosted model.
//! Run with `cargo test -- --ignored` on a machine with network access.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use std::sync::Arc;
use tower::util::ServiceExt;

use embedding_service::api::{create_router, AppState};
use embedding_service::infrastructure::{AppConfig, HubModelLoader};

async fn post_embed(app: axum::Router, text: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/embed")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
#[ignore] // Downloads all-MiniLM-L6-v2 from the HuggingFace Hub
async fn test_default_model_hello_world() {
    let config = AppConfig::default();
    let loader = Arc::new(HubModelLoader::from_config(&config.embedding));
    let app = create_router(AppState::new(config, loader));

    let (status, body) = post_embed(app.clone(), "hello world").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_name"], "all-MiniLM-L6-v2");
    assert_eq!(body["embedding"].as_array().unwrap().len(), 384);

    let (_, again) = post_embed(app, "hello world").await;
    for (a, b) in body["embedding"]
        .as_array()
        .unwrap()
        .iter()
        .zip(again["embedding"].as_array().unwrap())
    {
        assert!((a.as_f64().unwrap() - b.as_f64().unwrap()).abs() < 1e-5);
    }
}

#[tokio::test]
#[ignore] // Contacts the HuggingFace Hub
async fn test_nonexistent_model_is_degraded() {
    let mut config = AppConfig::default();
    config.embedding.model_name = "this-model-does-not-exist-0000".to_string();
    let loader = Arc::new(HubModelLoader::from_config(&config.embedding));
    let app = create_router(AppState::new(config, loader));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "degraded");

    let (status, _) = post_embed(app, "hello world").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
