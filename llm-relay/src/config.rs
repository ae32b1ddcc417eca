//! Configuration for llm-relay.

use std::path::Path;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: ChatDefaults,
}

/// Connection settings for the Ollama engine.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// How long Ollama keeps a loaded model in memory (e.g., "10m", "-1").
    #[serde(default = "default_keep_alive")]
    pub keep_alive: String,
    /// Pull the model before loading it, reporting download progress.
    #[serde(default = "default_true")]
    pub pull_missing: bool,
    /// Per-request timeout. Unset means no timeout, which streaming needs.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl EngineConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            keep_alive: default_keep_alive(),
            pull_missing: true,
            request_timeout_secs: None,
        }
    }
}

/// What a session keeps when loading a new model fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// Install the new engine only once its model has loaded.
    #[default]
    KeepPrevious,
    /// Install the new engine as soon as it is constructed, even if the load
    /// then fails.
    ReplaceOnConstruct,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub load_failure: LoadFailurePolicy,
}

/// Model and sampling used when the caller does not choose any.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

// Default values
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_keep_alive() -> String {
    "10m".to_string()
}
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    "llama3.2:1b".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.95
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (LLM_RELAY__SECTION__KEY format)
    /// 2. llm-relay.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("llm-relay").required(false))
    }

    /// Like [`Config::load`], reading the given file instead of `llm-relay.toml`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = ConfigLoader::builder()
            .set_default("engine.base_url", default_ollama_url())?
            .set_default("defaults.model", default_model())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("LLM_RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_engine_config() {
        let engine = EngineConfig::default();
        assert_eq!(engine.base_url, "http://localhost:11434");
        assert_eq!(engine.keep_alive, "10m");
        assert!(engine.pull_missing);
        assert!(engine.request_timeout_secs.is_none());
    }

    #[test]
    fn test_default_chat_defaults() {
        let defaults = ChatDefaults::default();
        assert_eq!(defaults.model, "llama3.2:1b");
        assert_eq!(defaults.temperature, 0.7);
        assert_eq!(defaults.top_p, 0.95);
    }

    #[test]
    fn test_load_failure_policy_default() {
        assert_eq!(
            SessionConfig::default().load_failure,
            LoadFailurePolicy::KeepPrevious
        );
    }
}
