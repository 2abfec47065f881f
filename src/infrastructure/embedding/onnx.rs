//! ONNX Runtime wrapper for sentence-transformer models.
//!
//! Runs a transformer encoder exported to ONNX, pools the token embeddings
//! (masked mean or CLS token) and optionally L2-normalizes the result. The output dimension is discovered from a probe inference when
//! the session is built, so any sentence-transformer export works, not just
//! the 384-dimension default.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::{Array2, ArrayView2, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::domain::{ports::EmbeddingModel, DomainError, Embedding};

const TOKEN_TYPE_IDS: &str = "token_type_ids";

/// How token embeddings collapse into one sentence vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pooling {
    /// Average of the token vectors, weighted by the attention mask.
    #[default]
    Mean,
    /// Vector of the first token.
    Cls,
}

impl Pooling {
    pub fn pool(&self, tokens: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
        match self {
            Self::Mean => mean_pool(tokens, attention_mask),
            Self::Cls => tokens
                .outer_iter()
                .next()
                .map(|row| row.to_vec())
                .unwrap_or_else(|| vec![0.0; tokens.ncols()]),
        }
    }
}

/// Options applied when building a session.
#[derive(Debug, Clone)]
pub struct OnnxOptions {
    pub max_length: usize,
    pub intra_threads: usize,
    pub normalize: bool,
    pub pooling: Pooling,
}

impl Default for OnnxOptions {
    fn default() -> Self {
        Self {
            max_length: 256,
            intra_threads: 4,
            normalize: true,
            pooling: Pooling::Mean,
        }
    }
}

/// Sentence embedding model backed by an ONNX Runtime session.
///
/// Cloning is cheap; the session sits behind `Arc<Mutex<_>>` because a run
/// needs exclusive access to it.
#[derive(Clone)]
pub struct OnnxEmbeddingModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_name: String,
    dimension: usize,
    normalize: bool,
    pooling: Pooling,
    token_type_ids: bool,
}

impl std::fmt::Debug for OnnxEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEmbeddingModel")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .field("normalize", &self.normalize)
            .field("pooling", &self.pooling)
            .field("token_type_ids", &self.token_type_ids)
            .finish_non_exhaustive()
    }
}

impl OnnxEmbeddingModel {
    /// Builds a session from model files on disk. Blocking.
    ///
    /// # Errors
    /// Fails if either file is missing or invalid, or if the probe inference
    /// does not produce `[batch, seq_len, hidden]` token embeddings.
    pub fn from_files(
        model_name: impl Into<String>,
        model_path: &Path,
        tokenizer_path: &Path,
        options: &OnnxOptions,
    ) -> Result<Self> {
        let model_name = model_name.into();

        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(options.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        // RoBERTa/MPNet exports reject a token_type_ids input.
        let token_type_ids =
            declares_token_type_ids(session.inputs.iter().map(|input| input.name.as_str()));

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: options.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;
        // Single-text requests never need padding.
        tokenizer.with_padding(None);

        let mut model = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_name,
            dimension: 0,
            normalize: options.normalize,
            pooling: options.pooling,
            token_type_ids,
        };

        let probe = model
            .embed_blocking("validation probe")
            .context("Validation inference failed")?;
        model.dimension = probe.len();

        info!(
            model = %model.model_name,
            dimension = model.dimension,
            normalize = model.normalize,
            pooling = ?model.pooling,
            token_type_ids = model.token_type_ids,
            "ONNX embedding model ready"
        );

        Ok(model)
    }

    /// Tokenizes, runs the session and pools a single text. Blocking.
    pub fn embed_blocking(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();

        let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
            .context("Failed to create input_ids array")?;
        let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .context("Failed to create attention_mask array")?;

        let mut inputs = ort::inputs![
            "input_ids" => Value::from_array(input_ids_array)?,
            "attention_mask" => Value::from_array(attention_mask_array)?
        ];
        if self.token_type_ids {
            let token_type_ids_array = Array2::<i64>::zeros((1, seq_len));
            inputs.push((
                TOKEN_TYPE_IDS.into(),
                Value::from_array(token_type_ids_array)?.into(),
            ));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("ONNX session lock poisoned: {}", e))?;
        let outputs = session.run(inputs)?;

        // Output names differ between exports; the token embeddings come first.
        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;
        if output.ndim() != 3 {
            anyhow::bail!(
                "Model outputs unexpected shape: {:?} (expected [batch, seq_len, hidden])",
                output.shape()
            );
        }

        let tokens = output
            .index_axis(Axis(0), 0)
            .into_dimensionality::<ndarray::Ix2>()
            .context("Failed to view token embeddings")?;
        let pooled = self.pooling.pool(tokens, &attention_mask);
        debug!(
            tokens = seq_len,
            dimension = pooled.len(),
            pooling = ?self.pooling,
            "Pooled token embeddings"
        );

        let embedding = if self.normalize {
            Embedding::new(pooled).normalized().into_inner()
        } else {
            pooled
        };

        if self.dimension != 0 && embedding.len() != self.dimension {
            anyhow::bail!(
                "Unexpected embedding dimension: {} (expected {})",
                embedding.len(),
                self.dimension
            );
        }

        Ok(embedding)
    }
}

fn declares_token_type_ids<'a>(mut input_names: impl Iterator<Item = &'a str>) -> bool {
    input_names.any(|name| name == TOKEN_TYPE_IDS)
}

/// Averages token vectors, weighting each by its attention mask entry.
fn mean_pool(tokens: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Vec<f32> {
    let hidden = tokens.shape()[1];
    let mut pooled = vec![0.0f32; hidden];
    let mut sum_mask = 0.0f32;

    for (row, &mask) in tokens.axis_iter(Axis(0)).zip(attention_mask) {
        let weight = mask as f32;
        sum_mask += weight;
        for (acc, value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value * weight;
        }
    }

    for value in &mut pooled {
        *value /= sum_mask.max(1e-9);
    }

    pooled
}

#[async_trait]
impl EmbeddingModel for OnnxEmbeddingModel {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let model = self.clone();
        let text = text.to_string();

        let result = tokio::task::spawn_blocking(move || model.embed_blocking(&text))
            .await
            .map_err(|e| DomainError::internal(format!("embedding task failed: {e}")))?;

        result
            .map(Embedding::new)
            .map_err(|e| DomainError::generation(format!("{e:#}")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
