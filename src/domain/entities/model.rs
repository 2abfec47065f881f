pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Lifecycle of the shared model handle. `Loaded` is terminal; a failed load
/// drops back to `Unloaded` so the next caller retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loading,
    Loaded,
}

impl ModelState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }
}
