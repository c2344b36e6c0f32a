//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/rollcall/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/rollcall/` (~/.config/rollcall/)
//! - Data: `$XDG_DATA_HOME/rollcall/` (~/.local/share/rollcall/)
//! - State/Logs: `$XDG_STATE_HOME/rollcall/` (~/.local/state/rollcall/)
//!
//! Nothing in the analysis code reads this module's globals; binaries load a
//! [`Config`] once and build collaborators from it.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Text-generation service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Sync server (disabled unless configured)
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Record store defaults
    #[serde(default)]
    pub records: RecordsConfig,
}

// ============================================
// [llm]
// ============================================

/// Text-generation provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider type
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model to use (ignored by providers that serve a fixed model)
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// HTTP request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            endpoint: None,
            api_key: None,
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Supported text-generation providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Self-hosted model server on this machine
    #[default]
    Local,
    /// Hugging Face Inference API
    HuggingFace,
    Ollama,
    OpenAI,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Local => "http://localhost:8080/api",
            LlmProvider::HuggingFace => {
                "https://api-inference.huggingface.co/models/meta-llama/Meta-Llama-3-8B-Instruct"
            }
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }

    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Local | LlmProvider::Ollama => None,
            LlmProvider::HuggingFace => Some("HF_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
        }
    }

    /// Whether requests need a bearer key
    pub fn requires_api_key(&self) -> bool {
        self.api_key_env().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Local => "local",
            LlmProvider::HuggingFace => "huggingface",
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAI => "openai",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(LlmProvider::Local),
            "huggingface" => Ok(LlmProvider::HuggingFace),
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" => Ok(LlmProvider::OpenAI),
            other => Err(Error::Config(format!("unknown llm provider: {}", other))),
        }
    }
}

impl LlmConfig {
    /// Configured endpoint, or the provider default
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| self.provider.default_endpoint().to_string())
    }

    /// Non-empty key from config, falling back to the provider env var
    pub fn resolved_api_key(&self) -> Option<String> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let env_name = self.provider.api_key_env()?;
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| lookup(env_name).filter(|k| !k.trim().is_empty()))
    }

    /// True when the provider can be called: key-less providers always can,
    /// remote ones need a non-empty key.
    pub fn has_valid_api_key(&self) -> bool {
        !self.provider.requires_api_key() || self.resolved_api_key().is_some()
    }
}

fn default_llm_model() -> String {
    "llama3".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

// ============================================
// [sync]
// ============================================

/// Sync server configuration
///
/// When enabled, AI analysis results are forwarded to the server after they
/// are returned, and `rollcall-sync` can push and pull full records.
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Enable/disable server sync
    #[serde(default)]
    pub enabled: bool,

    /// Sync server base URL (e.g., `https://sync.example.com/api`)
    pub server_url: Option<String>,

    /// Bearer token issued by the sync server
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_sync_timeout")]
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: None,
            api_key: None,
            timeout_secs: default_sync_timeout(),
        }
    }
}

/// Keys this short are placeholders, not server-issued tokens.
const MIN_SERVER_KEY_LEN: usize = 10;

impl SyncConfig {
    pub fn has_valid_server_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| k.trim().len() > MIN_SERVER_KEY_LEN)
    }

    /// Check if sync is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled
            && self
                .server_url
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty())
            && self.has_valid_server_key()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self
            .server_url
            .as_deref()
            .map_or(true, |u| u.trim().is_empty())
        {
            return Err(Error::Config(
                "sync.server_url is required when sync is enabled".to_string(),
            ));
        }
        if !self.has_valid_server_key() {
            return Err(Error::Config(format!(
                "sync.api_key must be longer than {} characters when sync is enabled",
                MIN_SERVER_KEY_LEN
            )));
        }
        Ok(())
    }
}

fn default_sync_timeout() -> u64 {
    30
}

// ============================================
// [logging]
// ============================================

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

// ============================================
// [records]
// ============================================

/// Record store defaults
#[derive(Debug, Deserialize, Clone)]
pub struct RecordsConfig {
    /// Classes created for a fresh store
    #[serde(default = "default_classes")]
    pub default_classes: Vec<String>,

    /// Number of recent dates in the daily trend view
    #[serde(default = "default_trend_days")]
    pub trend_days: usize,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            default_classes: default_classes(),
            trend_days: default_trend_days(),
        }
    }
}

fn default_classes() -> Vec<String> {
    vec!["1".to_string(), "2".to_string(), "3".to_string()]
}

fn default_trend_days() -> usize {
    14
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.sync.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/rollcall/config.toml` (~/.config/rollcall/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("rollcall").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("rollcall")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("rollcall")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/rollcall/data.db` (~/.local/share/rollcall/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// CLI binaries call this before anything else reads these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
