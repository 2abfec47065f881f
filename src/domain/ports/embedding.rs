use std::sync::Arc;

use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Shared reference to a loaded model.
pub type ModelHandle = Arc<dyn EmbeddingModel>;

#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_name: &str) -> Result<ModelHandle, DomainError>;
}
