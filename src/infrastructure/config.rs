use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::DEFAULT_MODEL_NAME;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model_name: String,
    pub max_length: usize,
    pub intra_threads: usize,
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8001,
            },
            embedding: EmbeddingConfig {
                model_name: DEFAULT_MODEL_NAME.to_string(),
                max_length: 256,
                intra_threads: 4,
                cache_dir: None,
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
        }
    }
}

impl AppConfig {
    /// Reads overrides from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            server: ServerConfig {
                host: string_var("HOST").unwrap_or(defaults.server.host),
                port: parse_var("PORT", defaults.server.port)?,
            },
            embedding: EmbeddingConfig {
                model_name: string_var("EMBEDDING_MODEL_NAME")
                    .unwrap_or(defaults.embedding.model_name),
                max_length: parse_var("EMBEDDING_MAX_LENGTH", defaults.embedding.max_length)?,
                intra_threads: parse_var(
                    "EMBEDDING_INTRA_THREADS",
                    defaults.embedding.intra_threads,
                )?,
                cache_dir: string_var("EMBEDDING_CACHE_DIR").map(PathBuf::from),
            },
            cors: CorsConfig {
                allowed_origins: string_var("CORS_ALLOWED_ORIGINS")
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|o| !o.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or(defaults.cors.allowed_origins),
            },
        })
    }
}

fn string_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string_var(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
