use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, Embedding};

pub const EMPTY_TEXT_MESSAGE: &str = "Text cannot be empty or whitespace only.";

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Rejects text that is empty once surrounding whitespace is removed.
    /// The untrimmed text is what gets encoded.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation(EMPTY_TEXT_MESSAGE));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingResult {
    pub text: String,
    pub embedding: Embedding,
    pub model_name: String,
}
