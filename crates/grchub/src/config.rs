//! Configuration loading and defaults.
//!
//! Layering: built-in defaults, then an optional TOML file (explicit
//! `--config` path or the per-user config dir), then `GRCHUB__`-prefixed
//! environment variables (e.g. `GRCHUB__SERVER__PORT=8080`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub knowledge: KnowledgeConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins; empty means permissive (development).
    pub cors_origins: Vec<String>,
    /// Wall-clock budget for one whole chat exchange, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4820,
            cors_origins: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Model provider configuration. The provider is anything speaking the
/// OpenAI-compatible streaming chat-completions shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "GRCHUB_API_KEY".to_string(),
            temperature: None,
        }
    }
}

/// Knowledge feed configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// External TOML feed; the built-in data set is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Per-user config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("grchub").join("config.toml"))
}

/// Load configuration from the optional file plus the environment.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    let file = path
        .map(Path::to_path_buf)
        .or_else(default_config_path);
    if let Some(file) = file {
        builder = builder.add_source(
            File::from(file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );
    }

    let built = builder
        .add_source(Environment::with_prefix("GRCHUB").separator("__"))
        .build()
        .context("building configuration")?;

    built.try_deserialize().context("loading configuration")
}

/// Write a default config file for `grchub init`.
pub fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let rendered =
        toml::to_string_pretty(&AppConfig::default()).context("serializing default config")?;
    fs::write(path, rendered)
        .with_context(|| format!("writing config file {}", path.display()))?;
    Ok(())
}
