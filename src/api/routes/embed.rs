use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::error::{ApiError, ApiJson};
use crate::api::state::AppState;
use crate::domain::{DomainError, EmbeddingRequest, EmbeddingResult};

#[derive(Debug, Serialize)]
pub struct EmbeddingResponse {
    pub text: String,
    pub embedding: Vec<f32>,
    pub model_name: String,
}

impl From<EmbeddingResult> for EmbeddingResponse {
    fn from(result: EmbeddingResult) -> Self {
        Self {
            text: result.text,
            embedding: result.embedding.into_inner(),
            model_name: result.model_name,
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

pub async fn embed_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmbeddingRequest>,
) -> Result<Json<EmbeddingResponse>, ApiError> {
    let snippet = preview(&request.text);
    info!(text = %snippet, "Received embedding request");

    match state.embedding_service.embed(request).await {
        Ok(result) => Ok(Json(result.into())),
        Err(e) => {
            match &e {
                DomainError::Validation(msg) => warn!(error = %msg, "Rejected embedding request"),
                DomainError::ModelLoad(_) | DomainError::Generation(_) => {
                    error!(error = %e, text = %snippet, "Failed to generate embedding")
                }
                DomainError::Internal(_) => {
                    error!(error = %e, text = %snippet, "Unexpected error in /embed")
                }
            }
            Err(e.into())
        }
    }
}
