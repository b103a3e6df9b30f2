//! Daemon configuration
//!
//! One YAML document covering every subsystem. Every section and every field
//! is optional; omitted values fall back to defaults, so an empty file is a
//! valid configuration.

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assistant::AssistantConfig;
use crate::executor::ExecutorConfig;
use crate::marketplace::MarketplaceConfig;
use crate::responder::ResponderConfig;
use crate::runner::RunnerConfig;
use crate::scheduler::SchedulerConfig;

/// Where the job roster lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Path to the roster YAML file
    pub path: PathBuf,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("roster.yml"),
        }
    }
}

/// Telegram failure notifications; disabled unless a chat id is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "bot-token-env")]
    pub bot_token_env: Option<String>,

    /// Chat to notify
    #[serde(rename = "chat-id")]
    pub chat_id: Option<String>,
}

impl TelegramConfig {
    /// Notifications are on when a chat id is configured
    pub fn enabled(&self) -> bool {
        self.chat_id.is_some()
    }

    /// Environment variable holding the bot token
    pub fn token_env(&self) -> &str {
        self.bot_token_env.as_deref().unwrap_or("TELEBOT_TOKEN")
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub runner: RunnerConfig,
    pub executor: ExecutorConfig,
    pub marketplace: MarketplaceConfig,
    pub assistant: AssistantConfig,
    pub responder: ResponderConfig,
    pub roster: RosterConfig,
    pub telegram: TelegramConfig,
}

impl Config {
    /// Load configuration, trying in order: the explicit path, ./replyd.yml,
    /// ~/.config/replyd/replyd.yml, then built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        debug!(?path, "Config::load: called");

        if let Some(path) = path {
            return Self::from_file(path);
        }

        let local = PathBuf::from("replyd.yml");
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("replyd").join("replyd.yml");
            if user.exists() {
                return Self::from_file(&user);
            }
        }

        info!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Config::from_file: loading");
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the daemon misbehave silently
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.tick_interval_secs == 0 {
            eyre::bail!("scheduler.tick-interval-secs must be positive");
        }
        if self.scheduler.max_concurrent_jobs == 0 {
            eyre::bail!("scheduler.max-concurrent-jobs must be positive");
        }
        if self.executor.max_attempts == 0 {
            eyre::bail!("executor.max-attempts must be positive");
        }
        if self.executor.backoff_factor < 1.0 {
            eyre::bail!("executor.backoff-factor must be at least 1.0");
        }
        if self.runner.attempts == 0 {
            eyre::bail!("runner.attempts must be positive");
        }
        if self.telegram.enabled() && std::env::var(self.telegram.token_env()).is_err() {
            eyre::bail!(
                "telegram notifications configured but the {} environment variable is not set",
                self.telegram.token_env()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.tick_interval_secs, 300);
        assert_eq!(config.executor.max_attempts, 3);
        assert!(!config.telegram.enabled());
    }

    #[test]
    fn test_empty_yaml_is_all_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.runner.attempts, 3);
        assert_eq!(config.roster.path, PathBuf::from("roster.yml"));
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
scheduler:
  tick-interval-secs: 60
  max-concurrent-jobs: 4
executor:
  max-attempts: 5
responder:
  reply-cap: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert_eq!(config.scheduler.max_concurrent_jobs, 4);
        assert_eq!(config.executor.max_attempts, 5);
        assert_eq!(config.responder.reply_cap, 10);
        // untouched sections keep defaults
        assert_eq!(config.runner.retry_delay_secs, 120);
        assert_eq!(config.marketplace.card_limit, 100);
    }

    #[test]
    fn test_full_sections_yaml() {
        let yaml = r#"
roster:
  path: /etc/replyd/clients.yml
telegram:
  bot-token-env: MY_BOT_TOKEN
  chat-id: "-100200300"
assistant:
  model: gpt-4o
  temperature: 0.3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.roster.path, PathBuf::from("/etc/replyd/clients.yml"));
        assert!(config.telegram.enabled());
        assert_eq!(config.telegram.token_env(), "MY_BOT_TOKEN");
        assert_eq!(config.assistant.model, "gpt-4o");
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sub_one_backoff_factor() {
        let mut config = Config::default();
        config.executor.backoff_factor = 0.5;
        assert!(config.validate().is_err());
    }
}
