mod embedding;
mod model_provider;

pub use embedding::EmbeddingService;
pub use model_provider::{ModelProvider, ModelStatus};
