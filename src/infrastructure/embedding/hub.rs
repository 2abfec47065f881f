use anyhow::{Context, Result};
use async_trait::async_trait;
use hf_hub::api::sync::{ApiBuilder, ApiRepo};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{
    ports::{ModelHandle, ModelLoader},
    DomainError,
};
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::embedding::onnx::{OnnxEmbeddingModel, OnnxOptions, Pooling};

const DEFAULT_ORGANIZATION: &str = "sentence-transformers";
const ONNX_MODEL_FILE: &str = "onnx/model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";
const MODULES_FILE: &str = "modules.json";
const NORMALIZE_MODULE: &str = "sentence_transformers.models.Normalize";
const POOLING_MODULE: &str = "sentence_transformers.models.Pooling";
const POOLING_CONFIG_FILE: &str = "config.json";

/// Loads ONNX sentence-transformer exports from the HuggingFace Hub.
///
/// Bare identifiers such as `all-MiniLM-L6-v2` resolve to the
/// `sentence-transformers` organization; `org/name` is used as given.
#[derive(Debug, Clone)]
pub struct HubModelLoader {
    cache_dir: Option<PathBuf>,
    max_length: usize,
    intra_threads: usize,
}

impl HubModelLoader {
    pub fn new() -> Self {
        Self {
            cache_dir: None,
            max_length: 256,
            intra_threads: 4,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            max_length: config.max_length,
            intra_threads: config.intra_threads,
        }
    }

    fn load_blocking(&self, model_name: &str) -> Result<OnnxEmbeddingModel> {
        let repo_id = resolve_repo_id(model_name);
        info!(repo = %repo_id, "Fetching model files from HuggingFace Hub");

        let mut builder = ApiBuilder::new().with_progress(false);
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder
            .build()
            .context("Failed to initialize HuggingFace API")?;
        let repo = api.model(repo_id.clone());

        let tokenizer_path = repo
            .get(TOKENIZER_FILE)
            .with_context(|| format!("Failed to download {TOKENIZER_FILE} from {repo_id}"))?;
        let model_path = repo
            .get(ONNX_MODEL_FILE)
            .with_context(|| format!("Failed to download {ONNX_MODEL_FILE} from {repo_id}"))?;

        let (normalize, pooling) = pipeline_from_repo(&repo);
        let options = OnnxOptions {
            max_length: self.max_length,
            intra_threads: self.intra_threads,
            normalize,
            pooling,
        };

        OnnxEmbeddingModel::from_files(model_name, &model_path, &tokenizer_path, &options)
    }
}

impl Default for HubModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelLoader for HubModelLoader {
    async fn load(&self, model_name: &str) -> Result<ModelHandle, DomainError> {
        let loader = self.clone();
        let model_name = model_name.to_string();

        let model = tokio::task::spawn_blocking(move || loader.load_blocking(&model_name))
            .await
            .map_err(|e| DomainError::model_load(format!("model load task failed: {e}")))?
            .map_err(|e| DomainError::model_load(format!("{e:#}")))?;

        Ok(Arc::new(model))
    }
}

pub fn resolve_repo_id(model_name: &str) -> String {
    if model_name.contains('/') {
        model_name.to_string()
    } else {
        format!("{DEFAULT_ORGANIZATION}/{model_name}")
    }
}

#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct PoolingConfig {
    #[serde(default)]
    pooling_mode_cls_token: bool,
}

/// Normalization and pooling as declared by the repo's `modules.json`.
/// Repos without one are mean-pooled and normalized.
fn pipeline_from_repo(repo: &ApiRepo) -> (bool, Pooling) {
    let modules = match repo.get(MODULES_FILE) {
        Ok(path) => match read_modules(&path) {
            Ok(modules) => modules,
            Err(e) => {
                warn!(error = %e, "Unreadable {MODULES_FILE}, normalizing embeddings");
                return (true, Pooling::Mean);
            }
        },
        Err(_) => return (true, Pooling::Mean),
    };

    let pooling = match pooling_config_file(&modules) {
        Some(file) => match repo
            .get(&file)
            .map_err(anyhow::Error::from)
            .and_then(|path| read_pooling(&path))
        {
            Ok(pooling) => pooling,
            Err(e) => {
                warn!(error = %e, file = %file, "Unreadable pooling config, using mean pooling");
                Pooling::Mean
            }
        },
        None => Pooling::Mean,
    };

    (includes_normalize(&modules), pooling)
}

fn read_modules(path: &Path) -> Result<Vec<ModuleEntry>> {
    let file = std::fs::File::open(path).context("Failed to open modules.json")?;
    serde_json::from_reader(file).context("Failed to parse modules.json")
}

fn read_pooling(path: &Path) -> Result<Pooling> {
    let file = std::fs::File::open(path).context("Failed to open pooling config")?;
    let config: PoolingConfig =
        serde_json::from_reader(file).context("Failed to parse pooling config")?;

    Ok(if config.pooling_mode_cls_token {
        Pooling::Cls
    } else {
        Pooling::Mean
    })
}

fn includes_normalize(modules: &[ModuleEntry]) -> bool {
    modules.iter().any(|m| m.kind == NORMALIZE_MODULE)
}

fn pooling_config_file(modules: &[ModuleEntry]) -> Option<String> {
    modules
        .iter()
        .find(|m| m.kind == POOLING_MODULE)
        .map(|m| m.path.trim_matches('/'))
        .filter(|dir| !dir.is_empty())
        .map(|dir| format!("{dir}/{POOLING_CONFIG_FILE}"))
}
