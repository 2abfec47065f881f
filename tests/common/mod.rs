#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use embedding_service::api::{create_router, AppState};
use embedding_service::domain::ports::{EmbeddingModel, ModelHandle, ModelLoader};
use embedding_service::domain::{DomainError, Embedding};
use embedding_service::infrastructure::AppConfig;

pub const DIMENSION: usize = 384;

/// Deterministic stand-in for the ONNX model: the vector is derived from a
/// hash of the text, so identical inputs give identical outputs.
pub struct HashModel {
    name: String,
    dimension: usize,
}

#[async_trait]
impl EmbeddingModel for HashModel {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let values = (0..self.dimension)
            .map(|i| {
                seed = seed.wrapping_mul(1664525).wrapping_add(1013904223) ^ (i as u64);
                ((seed as f64 / u64::MAX as f64) * 2.0 - 1.0) as f32
            })
            .collect();

        Ok(Embedding::new(values).normalized())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Model whose inference always fails with the given error.
pub struct BrokenModel {
    error: DomainError,
}

#[async_trait]
impl EmbeddingModel for BrokenModel {
    async fn embed(&self, _text: &str) -> Result<Embedding, DomainError> {
        Err(self.error.clone())
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        "broken"
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Healthy,
    FailLoad,
    FailEmbed,
    Internal,
}

pub struct StubLoader {
    pub loads: AtomicUsize,
    pub fail: AtomicBool,
    behaviour: Behaviour,
}

impl StubLoader {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            fail: AtomicBool::new(behaviour == Behaviour::FailLoad),
            behaviour,
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self, model_name: &str) -> Result<ModelHandle, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;

        if self.fail.load(Ordering::SeqCst) {
            return Err(DomainError::model_load(format!(
                "Repository sentence-transformers/{model_name} not found"
            )));
        }

        match self.behaviour {
            Behaviour::FailEmbed => Ok(Arc::new(BrokenModel {
                error: DomainError::generation("ONNX session run failed"),
            })),
            Behaviour::Internal => Ok(Arc::new(BrokenModel {
                error: DomainError::internal("embedding task panicked"),
            })),
            _ => Ok(Arc::new(HashModel {
                name: model_name.to_string(),
                dimension: DIMENSION,
            })),
        }
    }
}

pub fn config_with_model(model_name: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.embedding.model_name = model_name.to_string();
    config
}

pub fn app(loader: Arc<StubLoader>) -> Router {
    app_with_config(config_with_model("all-MiniLM-L6-v2"), loader)
}

pub fn app_with_config(config: AppConfig, loader: Arc<StubLoader>) -> Router {
    create_router(AppState::new(config, loader))
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

pub async fn embed(app: Router, text: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "text": text }).to_string();
    send(app, Method::POST, "/embed", Some(&body)).await
}
