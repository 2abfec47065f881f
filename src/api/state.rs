use std::sync::Arc;

use crate::application::{EmbeddingService, ModelProvider};
use crate::domain::ports::ModelLoader;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<ModelProvider>,
    pub embedding_service: Arc<EmbeddingService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, loader: Arc<dyn ModelLoader>) -> Self {
        let provider = Arc::new(ModelProvider::new(
            config.embedding.model_name.clone(),
            loader,
        ));
        let embedding_service = Arc::new(EmbeddingService::new(provider.clone()));

        Self {
            provider,
            embedding_service,
            config: Arc::new(config),
        }
    }
}
