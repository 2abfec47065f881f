use std::sync::Arc;
use tracing::instrument;

use crate::application::services::ModelProvider;
use crate::domain::{DomainError, EmbeddingRequest, EmbeddingResult};

pub struct EmbeddingService {
    provider: Arc<ModelProvider>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    #[instrument(skip(self, request), fields(len = request.text.len()))]
    pub async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResult, DomainError> {
        request.validate()?;

        let handle = self.provider.ensure_loaded().await?;
        let embedding = self.provider.encode(&handle, &request.text).await?;

        Ok(EmbeddingResult {
            text: request.text,
            embedding,
            model_name: self.provider.model_name().to_string(),
        })
    }
}
