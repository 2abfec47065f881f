pub mod config;
pub mod embedding;

pub use config::{AppConfig, ConfigError, CorsConfig, EmbeddingConfig, ServerConfig};
pub use embedding::{HubModelLoader, OnnxEmbeddingModel, OnnxOptions};
