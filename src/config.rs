/// Configuration module.
///
/// Handles loading, validating, and providing default configuration values,
/// plus the environment-supplied secrets (GitHub token, OpenRouter key).
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable holding the GitHub access token (needed by `index`).
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Environment variable holding the OpenRouter API key (needed by `ask`).
pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";

// ── Default value functions ──────────────────────────────────────────

fn default_repos_dir() -> String {
    "./repos".to_string()
}

fn default_snapshot_path() -> String {
    "./embeddings.json".to_string()
}

fn default_search_top_k() -> usize {
    3
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_model_dir() -> String {
    "./models/all-MiniLM-L6-v2".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_chat_model() -> String {
    "deepseek/deepseek-r1-0528-qwen3-8b:free".to_string()
}

fn default_chat_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// GitHub repositories to index, as `owner/name` identifiers.
    #[serde(default)]
    pub repositories: Vec<String>,

    #[serde(default = "default_repos_dir")]
    pub repos_dir: String,

    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_model_dir")]
    pub dir: String,

    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            repos_dir: default_repos_dir(),
            snapshot_path: default_snapshot_path(),
            search_top_k: default_search_top_k(),
            model: ModelConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            dir: default_model_dir(),
            dimensions: default_dimensions(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            base_url: default_chat_base_url(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If the file does not exist, returns a default config and generates a
    /// template at the default path so users have something to edit.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !std::path::Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON in {path}"))?;

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        anyhow::ensure!(!self.snapshot_path.is_empty(), "snapshot_path must be set");
        Ok(())
    }

    /// The GitHub access token, required before any clone work starts.
    pub fn github_token(&self) -> Result<String> {
        require_env(GITHUB_TOKEN_VAR)
    }

    /// The OpenRouter API key, required before answering.
    pub fn openrouter_api_key(&self) -> Result<String> {
        require_env(OPENROUTER_KEY_VAR)
    }
}

fn require_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("{var} is not set; export it before running this command"),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.repositories.is_empty());
        assert_eq!(config.repos_dir, "./repos");
        assert_eq!(config.snapshot_path, "./embeddings.json");
        assert_eq!(config.search_top_k, 3);
        assert_eq!(config.model.dimensions, 384);
        assert_eq!(config.model.name, "all-MiniLM-L6-v2");
        assert!(config.chat.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"repositories": ["acme/app"], "search_top_k": 5}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.repositories, vec!["acme/app"]);
        assert_eq!(config.search_top_k, 5);
        // Other fields keep defaults
        assert_eq!(config.snapshot_path, "./embeddings.json");
        assert_eq!(config.model.dimensions, 384);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_top_k() {
        let mut config = Config::default();
        config.search_top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_snapshot_path() {
        let mut config = Config::default();
        config.snapshot_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.repos_dir, config.repos_dir);
        assert_eq!(parsed.chat.model, config.chat.model);
        assert_eq!(parsed.model.dir, config.model.dir);
    }

    #[test]
    fn test_require_env_missing() {
        let err = require_env("CODEASK_TEST_SURELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("CODEASK_TEST_SURELY_UNSET"));
    }
}
