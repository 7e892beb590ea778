use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles loading, overriding and validating the settings the
/// translation pipeline needs: the vault root, the collection name, provider
/// credentials and backup retention.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Sandbox root every note path is resolved against
    #[serde(default)]
    pub vault_path: PathBuf,

    /// Collection name addresses must carry; derived from `vault_path` when unset
    #[serde(default)]
    pub vault_name: Option<String>,

    /// Generation provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Days a backup is kept before pruning removes it
    #[serde(default = "default_backup_retention_days")]
    pub backup_retention_days: u32,

    /// Pipelines run at the same time by batch operations
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Target language used when a request names none
    #[serde(default = "default_target_language")]
    pub default_target_language: String,

    /// Fail a translation whose output lost a code placeholder
    #[serde(default)]
    pub strict_placeholders: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_anthropic_endpoint")]
    pub endpoint: String,

    // @field: Output token bound per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // @field: Deadline for one generation call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_anthropic_model(),
            endpoint: default_anthropic_endpoint(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Equivalent `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Environment variable naming the vault root
pub const ENV_VAULT_PATH: &str = "OBSIDIAN_VAULT_PATH";
/// Environment variable naming the collection
pub const ENV_VAULT_NAME: &str = "OBSIDIAN_VAULT_NAME";
/// Environment variable carrying the provider credential
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Environment variable overriding the model
pub const ENV_MODEL: &str = "ANTHROPIC_MODEL";
/// Environment variable overriding backup retention
pub const ENV_BACKUP_RETENTION_DAYS: &str = "BACKUP_RETENTION_DAYS";

fn default_backup_retention_days() -> u32 {
    30
}

fn default_batch_concurrency() -> usize {
    3
}

fn default_target_language() -> String {
    "English".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

impl Config {
    /// Load a JSON config file, or start from defaults if it does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_VAULT_PATH) {
            self.vault_path = PathBuf::from(path);
        }
        if let Some(name) = get(ENV_VAULT_NAME) {
            self.vault_name = Some(name);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = key;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.provider.model = model;
        }
        if let Some(days) = get(ENV_BACKUP_RETENTION_DAYS) {
            self.backup_retention_days = days
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of days, got '{}'", ENV_BACKUP_RETENTION_DAYS, days))?;
        }
        Ok(self)
    }

    /// Collection name: explicit setting, else the vault root's last segment
    pub fn collection_name(&self) -> String {
        if let Some(name) = self.vault_name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        self.vault_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.vault_path.as_os_str().is_empty() {
            return Err(anyhow!("Vault path is required (set {} or vault_path)", ENV_VAULT_PATH));
        }
        if !self.vault_path.is_dir() {
            return Err(anyhow!("Vault path is not a directory: {:?}", self.vault_path));
        }
        if self.collection_name().is_empty() {
            return Err(anyhow!("Collection name could not be derived from {:?}", self.vault_path));
        }
        if self.provider.api_key.is_empty() {
            return Err(anyhow!("API key is required (set {} or provider.api_key)", ENV_API_KEY));
        }
        if self.batch_concurrency == 0 {
            return Err(anyhow!("batch_concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            vault_path: PathBuf::new(),
            vault_name: None,
            provider: ProviderConfig::default(),
            backup_retention_days: default_backup_retention_days(),
            batch_concurrency: default_batch_concurrency(),
            default_target_language: default_target_language(),
            strict_placeholders: false,
            log_level: LogLevel::default(),
        }
    }
}
