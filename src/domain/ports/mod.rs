mod embedding;

pub use embedding::{EmbeddingModel, ModelHandle, ModelLoader};
