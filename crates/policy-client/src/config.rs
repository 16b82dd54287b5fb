//! Configuration management for tiller.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Retry policy for transport-level failures.
///
/// Retries happen inside this boundary; the orchestration core never sees a
/// transient failure that a retry absorbed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Base backoff between attempts; grows linearly per attempt
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 500,
        }
    }
}

/// Client configuration, loaded from tiller.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// Model to request decisions from
    pub model: String,
    /// Environment variable holding the API key (sent only when set)
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/v1".to_string(),
            model: "llama3.2".to_string(),
            api_key_env: "TILLER_API_KEY".to_string(),
            timeout_secs: 60,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration, falling back to defaults when no tiller.toml is
    /// found in the working directory or `~/.config/tiller/`.
    pub fn load() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No tiller.toml found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        debug!(path = %path.display(), "Loaded client config");
        Ok(config)
    }

    fn find_config_path() -> Option<PathBuf> {
        let local = PathBuf::from("tiller.toml");
        if local.is_file() {
            return Some(local);
        }
        let home = std::env::var_os("HOME")?;
        let user = PathBuf::from(home).join(".config/tiller/tiller.toml");
        user.is_file().then_some(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:11434/v1");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_load_from_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
base_url = "https://api.example.com/v1"
model = "gpt-4o-mini"

[retry]
max_retries = 5
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.retry.max_retries, 5);
        // Unspecified fields keep their defaults.
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.retry.backoff_ms, 500);
    }

    #[test]
    fn test_load_from_invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base_url = [not toml").unwrap();
        assert!(ClientConfig::load_from(file.path()).is_err());
    }
}
