mod embedding;
mod model;
mod request;

pub use embedding::Embedding;
pub use model::{ModelState, DEFAULT_MODEL_NAME};
pub use request::{EmbeddingRequest, EmbeddingResult, EMPTY_TEXT_MESSAGE};
