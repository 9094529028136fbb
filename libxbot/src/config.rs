//! Configuration management for xbot
//!
//! Settings live in a TOML file. Every section is optional; a missing file
//! yields the built-in defaults. Durations are written as humantime strings
//! (`"60s"`, `"15m"`, `"2h"`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub polling: PollingConfig,
    pub schedule: ScheduleConfig,
    pub trusted_sources: TrustedSourcesConfig,
    pub limits: LimitsConfig,
    pub llm: LlmConfig,
    pub x: XConfig,
    pub logging: LogFileConfig,
}

/// Timing of the auto-like / auto-retweet loops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(with = "duration_str")]
    pub tick_interval: Duration,
    #[serde(with = "duration_str")]
    pub cooldown: Duration,
    #[serde(with = "duration_str")]
    pub rate_limit_backoff: Duration,
    #[serde(with = "duration_str")]
    pub error_backoff: Duration,
    #[serde(with = "duration_str")]
    pub empty_backoff: Duration,
    pub max_results: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            cooldown: Duration::from_secs(15 * 60),
            rate_limit_backoff: Duration::from_secs(15 * 60),
            error_backoff: Duration::from_secs(60),
            empty_backoff: Duration::from_secs(60),
            max_results: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    #[serde(with = "duration_str")]
    pub interval: Duration,
    pub csv_path: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2 * 3600),
            csv_path: "tweets.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustedSourcesConfig {
    pub path: String,
}

impl Default for TrustedSourcesConfig {
    fn default() -> Self {
        Self {
            path: "trusted_sources.txt".to_string(),
        }
    }
}

/// Daily action cap shared by the poller and the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub daily_actions: u32,
    #[serde(with = "duration_str")]
    pub reset_interval: Duration,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_actions: 17,
            reset_interval: Duration::from_secs(24 * 3600),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub response_max_tokens: u32,
    pub post_max_tokens: u32,
    pub display_limit: usize,
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            response_max_tokens: 150,
            post_max_tokens: 100,
            display_limit: 280,
            system_prompt: "You are a helpful Twitter bot assistant. You provide concise, \
                engaging responses that fit within Twitter's character limit."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XConfig {
    pub api_base: String,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogFileConfig {
    pub file: String,
    pub level: String,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            file: "bot.log".to_string(),
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file is not an error: the defaults are returned instead.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loops cannot run with
    ///
    /// A zero tick or schedule interval would turn a wait into a busy loop.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("polling.tick_interval", self.polling.tick_interval),
            ("schedule.interval", self.schedule.interval),
        ];
        for (field, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Resolve the configuration file path following XDG Base Directory conventions
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("XBOT_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("xbot").join("config.toml"))
}

/// Expand `~` in a configured file path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
