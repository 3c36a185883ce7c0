use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Top-level configuration for the orchestration engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgoraConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub provider: ProviderDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pacing delay between agent turns, for live observers. Not a
    /// correctness mechanism.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,

    /// When false, messages are persisted without scoring annotations.
    #[serde(default = "default_true")]
    pub scoring_enabled: bool,

    /// How many prior messages the scorers see verbatim.
    #[serde(default = "default_scoring_context")]
    pub scoring_context_messages: usize,

    /// How many top-scored excerpts the summary prompt includes.
    #[serde(default = "default_summary_excerpts")]
    pub summary_excerpts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDefaults {
    /// OpenAI-compatible endpoint backing the managed provider variant.
    #[serde(default = "default_managed_base_url")]
    pub managed_base_url: String,

    #[serde(default = "default_managed_model")]
    pub managed_model: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_turn_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_scoring_context() -> usize {
    5
}

fn default_summary_excerpts() -> usize {
    5
}

fn default_managed_base_url() -> String {
    "http://127.0.0.1:11434/v1".to_string()
}

fn default_managed_model() -> String {
    "default".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: default_turn_delay_ms(),
            scoring_enabled: true,
            scoring_context_messages: default_scoring_context(),
            summary_excerpts: default_summary_excerpts(),
        }
    }
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            managed_base_url: default_managed_base_url(),
            managed_model: default_managed_model(),
        }
    }
}

impl AgoraConfig {
    /// Load configuration from `agora.toml` in the working directory (if
    /// present) overlaid with `AGORA_*` environment variables.
    pub fn load() -> Result<Self, ConfigLoadError> {
        dotenvy::dotenv().ok();

        let settings = ConfigBuilder::builder()
            .add_source(File::with_name("agora").required(false))
            .add_source(Environment::with_prefix("AGORA").separator("__"))
            .build()?;

        let config: AgoraConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file path plus the environment
    /// overlay.
    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        let settings = ConfigBuilder::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("AGORA").separator("__"))
            .build()?;

        let config: AgoraConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.engine.scoring_context_messages == 0 {
            return Err(ConfigLoadError::InvalidValue {
                key: "engine.scoring_context_messages".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.provider.managed_base_url.is_empty() {
            return Err(ConfigLoadError::InvalidValue {
                key: "provider.managed_base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Initialize the global tracing subscriber from the logging section.
///
/// `RUST_LOG` takes precedence over the configured level; repeated calls
/// are no-ops.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    if config.json_format {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
