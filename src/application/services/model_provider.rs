use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, instrument};

use crate::domain::{
    ports::{EmbeddingModel, ModelHandle, ModelLoader},
    DomainError, Embedding, ModelState, EMPTY_TEXT_MESSAGE,
};

type LoadFuture = Shared<BoxFuture<'static, Result<ModelHandle, DomainError>>>;

enum Slot {
    Unloaded,
    Loading { attempt: u64, load: LoadFuture },
    Loaded(ModelHandle),
}

struct Inner {
    slot: Slot,
    attempts: u64,
}

/// Outcome of a model probe, as reported by the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Loaded { model_name: String },
    Failed { detail: String },
}

/// Owns the single lazily loaded model.
///
/// Concurrent callers of [`ModelProvider::ensure_loaded`] share one in-flight
/// load and all observe its outcome. A failed load leaves the provider
/// unloaded, so the next call starts a fresh attempt.
pub struct ModelProvider {
    model_name: String,
    loader: Arc<dyn ModelLoader>,
    inner: Mutex<Inner>,
}

impl ModelProvider {
    pub fn new(model_name: impl Into<String>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            model_name: model_name.into(),
            loader,
            inner: Mutex::new(Inner {
                slot: Slot::Unloaded,
                attempts: 0,
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn state(&self) -> ModelState {
        match self.lock() {
            Ok(inner) => match inner.slot {
                Slot::Unloaded => ModelState::Unloaded,
                Slot::Loading { .. } => ModelState::Loading,
                Slot::Loaded(_) => ModelState::Loaded,
            },
            Err(_) => ModelState::Unloaded,
        }
    }

    #[instrument(skip(self), fields(model = %self.model_name))]
    pub async fn ensure_loaded(&self) -> Result<ModelHandle, DomainError> {
        let (attempt, load) = {
            let mut inner = self.lock()?;

            // An attempt can finish with nobody left to settle the slot.
            let finished = match &inner.slot {
                Slot::Loading { load, .. } => load.peek().cloned(),
                _ => None,
            };
            if let Some(outcome) = finished {
                inner.slot = match outcome {
                    Ok(handle) => Slot::Loaded(handle),
                    Err(_) => Slot::Unloaded,
                };
            }

            match &inner.slot {
                Slot::Loaded(handle) => return Ok(handle.clone()),
                Slot::Loading { attempt, load } => (*attempt, load.clone()),
                Slot::Unloaded => {
                    inner.attempts += 1;
                    let attempt = inner.attempts;
                    let load = self.start_load();
                    inner.slot = Slot::Loading {
                        attempt,
                        load: load.clone(),
                    };
                    (attempt, load)
                }
            }
        };

        let result = load.await;

        let mut inner = self.lock()?;
        if matches!(&inner.slot, Slot::Loading { attempt: current, .. } if *current == attempt) {
            inner.slot = match &result {
                Ok(handle) => Slot::Loaded(handle.clone()),
                Err(_) => Slot::Unloaded,
            };
        }

        result
    }

    /// Runs `text` through a loaded model. An empty vector or one whose
    /// length disagrees with the model dimension is a generation failure.
    #[instrument(skip(self, handle, text), fields(model = %handle.model_name(), len = text.len()))]
    pub async fn encode(&self, handle: &ModelHandle, text: &str) -> Result<Embedding, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::validation(EMPTY_TEXT_MESSAGE));
        }

        let embedding = handle.embed(text).await?;

        if embedding.is_empty() {
            return Err(DomainError::generation("model returned an empty embedding"));
        }
        if embedding.dimension() != handle.dimension() {
            return Err(DomainError::generation(format!(
                "expected {} dimensions, got {}",
                handle.dimension(),
                embedding.dimension()
            )));
        }

        Ok(embedding)
    }

    pub async fn probe(&self) -> ModelStatus {
        let state = self.state();
        if !state.is_loaded() {
            info!(model = %self.model_name, ?state, "Model not loaded, loading for health check");
        }

        match self.ensure_loaded().await {
            Ok(handle) => ModelStatus::Loaded {
                model_name: handle.model_name().to_string(),
            },
            Err(e) => ModelStatus::Failed {
                detail: e.to_string(),
            },
        }
    }

    fn start_load(&self) -> LoadFuture {
        let loader = self.loader.clone();
        let model_name = self.model_name.clone();

        async move {
            info!(model = %model_name, "Loading embedding model");
            match loader.load(&model_name).await {
                Ok(handle) => {
                    info!(
                        model = %model_name,
                        dimension = handle.dimension(),
                        "Embedding model loaded"
                    );
                    Ok(handle)
                }
                Err(e) => {
                    error!(model = %model_name, error = %e, "Failed to load embedding model");
                    Err(match e {
                        DomainError::ModelLoad(_) => e,
                        other => DomainError::model_load(other.to_string()),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DomainError> {
        self.inner
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))
    }
}
