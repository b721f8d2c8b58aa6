//! Configuration system for Prospector.
//!
//! Uses `figment` for layered configuration: defaults -> `prospector.toml`
//! in the working directory -> `PROSPECTOR_*` environment variables
//! (double-underscore nesting, e.g. `PROSPECTOR_LLM__MODEL`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// Configuration for the generation capability (OpenAI-compatible endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions endpoint (vLLM, Ollama, OpenAI, ...).
    pub base_url: String,
    /// Model identifier sent in each request.
    pub model: String,
    /// Environment variable holding the API key. Local endpoints may leave
    /// the variable unset; a dummy bearer token is used instead.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Wall-clock bound per completion request.
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "nvidia/NVIDIA-Nemotron-3-Nano-30B-A3B-BF16".to_string(),
            api_key_env: "PROSPECTOR_LLM_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout_secs: 120,
            retry: RetryConfig::default(),
        }
    }
}

/// Explicit retry policy for external calls: attempt cap, backoff curve, and
/// jitter. Passed by value to the call wrapper, no hidden control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Configuration for the search capability (SearXNG endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the SearXNG instance.
    pub base_url: String,
    /// Default result cap per query.
    pub max_results: usize,
    pub timeout_secs: u64,
    /// Directory for the on-disk query cache. `None` disables caching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8888".to_string(),
            max_results: 10,
            timeout_secs: 30,
            cache_dir: Some(PathBuf::from("data/cache")),
        }
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// On-disk locations for completed reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub reports_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("data/reports"),
        }
    }
}

/// Load configuration with layered precedence: defaults, then an optional
/// `prospector.toml` in `dir` (or the working directory), then environment.
pub fn load_config(dir: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    let toml_path = dir
        .map(|d| d.join("prospector.toml"))
        .unwrap_or_else(|| PathBuf::from("prospector.toml"));
    if toml_path.exists() {
        figment = figment.merge(Toml::file(&toml_path));
    }

    figment = figment.merge(Env::prefixed("PROSPECTOR_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm.base_url, "http://localhost:8000/v1");
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_retries, 3);
        assert_eq!(retry.initial_backoff_ms, 1000);
        assert!(retry.jitter);
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.llm.model, AppConfig::default().llm.model);
    }

    #[test]
    fn test_load_config_merges_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("prospector.toml"),
            "[llm]\nmodel = \"qwen2.5:14b\"\n\n[server]\nport = 9090\n",
        )
        .unwrap();
        let config = load_config(Some(dir.path())).unwrap();
        assert_eq!(config.llm.model, "qwen2.5:14b");
        assert_eq!(config.server.port, 9090);
        // untouched sections keep defaults
        assert_eq!(config.search.max_results, 10);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let restored: AppConfig = toml::from_str(&toml).unwrap();
        assert_eq!(restored.server.port, config.server.port);
        assert_eq!(restored.llm.base_url, config.llm.base_url);
    }
}
