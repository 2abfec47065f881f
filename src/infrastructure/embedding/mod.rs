mod hub;
mod onnx;

pub use hub::{resolve_repo_id, HubModelLoader};
pub use onnx::{OnnxEmbeddingModel, OnnxOptions, Pooling};
