//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than on the ONNX
//! adapter, so the HTTP layer and tests can swap the model loader freely.

pub mod services;

pub use services::{EmbeddingService, ModelProvider, ModelStatus};
