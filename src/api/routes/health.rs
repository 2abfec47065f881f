use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use crate::api::state::AppState;
use crate::application::ModelStatus;

/// How a probe reports a model that failed to load.
///
/// `Liveness` always answers 200 and reports degradation only in the body.
/// `Readiness` answers 503 until the model loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePolicy {
    Liveness,
    Readiness,
}

impl ProbePolicy {
    pub fn status_code(&self, status: &ModelStatus) -> StatusCode {
        match (self, status) {
            (_, ModelStatus::Loaded { .. }) | (Self::Liveness, _) => StatusCode::OK,
            (Self::Readiness, ModelStatus::Failed { .. }) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub model_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<ModelStatus> for HealthResponse {
    fn from(status: ModelStatus) -> Self {
        match status {
            ModelStatus::Loaded { model_name } => Self {
                status: "healthy".into(),
                model_status: "loaded".into(),
                model_name: Some(model_name),
                detail: None,
            },
            ModelStatus::Failed { detail } => Self {
                status: "degraded".into(),
                model_status: "error_loading_model".into(),
                model_name: None,
                detail: Some(detail),
            },
        }
    }
}

async fn probe(state: &AppState, policy: ProbePolicy) -> (StatusCode, Json<HealthResponse>) {
    let status = state.provider.probe().await;
    if let ModelStatus::Failed { detail } = &status {
        error!(?policy, error = %detail, "Health check: model not loaded");
    }

    (policy.status_code(&status), Json(status.into()))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    probe(&state, ProbePolicy::Liveness).await
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    probe(&state, ProbePolicy::Readiness).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_status_codes() {
        let loaded = ModelStatus::Loaded {
            model_name: "m".into(),
        };
        let failed = ModelStatus::Failed {
            detail: "boom".into(),
        };

        assert_eq!(ProbePolicy::Liveness.status_code(&loaded), StatusCode::OK);
        assert_eq!(ProbePolicy::Liveness.status_code(&failed), StatusCode::OK);
        assert_eq!(ProbePolicy::Readiness.status_code(&loaded), StatusCode::OK);
        assert_eq!(
            ProbePolicy::Readiness.status_code(&failed),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_degraded_body_omits_model_name() {
        let body = HealthResponse::from(ModelStatus::Failed {
            detail: "Model load error: 404".into(),
        });
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "status": "degraded",
                "model_status": "error_loading_model",
                "detail": "Model load error: 404"
            })
        );
    }
}
