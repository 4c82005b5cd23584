//! DersBell configuration system.
//!
//! Loaded from TOML (default `~/.dersbell/config.toml`); channel secrets may
//! be overridden from the environment so deployments never write tokens to
//! disk. `validate()` runs before anything else at startup — an enabled
//! channel with a missing credential refuses to start the process.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DersBellError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DersBellConfig {
    /// Civil UTC offset the triggers run in, hours. Asia/Baku is +4 and has
    /// no DST, so a fixed offset is exact.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    /// A date inside the first ("tək") week of the semester.
    #[serde(default = "default_semester_start")]
    pub semester_start: NaiveDate,
    #[serde(default)]
    pub triggers: TriggerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

fn default_utc_offset() -> i32 {
    4
}
fn default_semester_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 15).unwrap_or_default()
}

impl Default for DersBellConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset(),
            semester_start: default_semester_start(),
            triggers: TriggerConfig::default(),
            notify: NotifyConfig::default(),
            store: StoreConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl DersBellConfig {
    /// Load config from the default path (~/.dersbell/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DersBellError::config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DersBellError::config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dersbell")
            .join("config.toml")
    }

    /// Override channel secrets from the environment. File values lose to
    /// the environment so tokens never have to live on disk.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("DERSBELL_TELEGRAM_BOT_TOKEN")
            && !token.is_empty()
        {
            self.channel
                .telegram
                .get_or_insert_with(TelegramChannelConfig::default)
                .bot_token = token;
        }
        if let Ok(chat_id) = std::env::var("DERSBELL_TELEGRAM_CHAT_ID")
            && !chat_id.is_empty()
            && let Some(telegram) = self.channel.telegram.as_mut()
        {
            telegram.fallback_chat_id = Some(chat_id);
        }
        if let Ok(key) = std::env::var("DERSBELL_FCM_SERVER_KEY")
            && !key.is_empty()
            && let Some(push) = self.channel.push.as_mut()
        {
            push.server_key = key;
        }
        if let Ok(password) = std::env::var("DERSBELL_SMTP_PASSWORD")
            && !password.is_empty()
            && let Some(email) = self.channel.email.as_mut()
        {
            email.password = password;
        }
    }

    /// Startup validation. Incomplete credentials are fatal — the process
    /// must refuse to start rather than run degraded.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        if let Some(push) = self.channel.push.as_ref().filter(|c| c.enabled)
            && push.server_key.is_empty()
        {
            return Err(DersBellError::config(
                "push channel enabled but server_key is empty",
            ));
        }
        if let Some(email) = self.channel.email.as_ref().filter(|c| c.enabled)
            && (email.smtp_host.is_empty() || email.username.is_empty() || email.password.is_empty())
        {
            return Err(DersBellError::config(
                "email channel enabled but smtp_host/username/password incomplete",
            ));
        }
        if let Some(telegram) = self.channel.telegram.as_ref().filter(|c| c.enabled)
            && telegram.bot_token.is_empty()
        {
            return Err(DersBellError::config(
                "telegram channel enabled but bot_token is empty",
            ));
        }

        let enabled = self.channel.push.as_ref().is_some_and(|c| c.enabled)
            || self.channel.email.as_ref().is_some_and(|c| c.enabled)
            || self.channel.telegram.as_ref().is_some_and(|c| c.enabled);
        if !enabled {
            return Err(DersBellError::config("no notification channel configured"));
        }
        Ok(())
    }

    /// The fixed civil offset the triggers are evaluated in.
    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            DersBellError::config(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }
}

/// Cron expressions for the two triggers, evaluated in the configured
/// civil offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Once-daily digest of tomorrow's lessons.
    #[serde(default = "default_digest_cron")]
    pub digest_cron: String,
    /// Poll for imminent lessons.
    #[serde(default = "default_reminder_cron")]
    pub reminder_cron: String,
}

fn default_digest_cron() -> String {
    "0 20 * * *".into()
}
fn default_reminder_cron() -> String {
    "*/5 * * * *".into()
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            digest_cron: default_digest_cron(),
            reminder_cron: default_reminder_cron(),
        }
    }
}

/// Evaluation and dispatch knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Subject marking an empty timetable slot; excluded everywhere.
    #[serde(default = "default_sentinel")]
    pub no_lesson_sentinel: String,
    /// Upper bound on one channel send, seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_sentinel() -> String {
    "Dərs yoxdur".into()
}
fn default_send_timeout() -> u64 {
    10
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            no_lesson_sentinel: default_sentinel(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Where the JSON stores live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_dir")]
    pub dir: String,
}

fn default_store_dir() -> String {
    "~/.dersbell/store".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
        }
    }
}

impl StoreConfig {
    pub fn dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).to_string())
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub push: Option<PushChannelConfig>,
    #[serde(default)]
    pub email: Option<EmailChannelConfig>,
    #[serde(default)]
    pub telegram: Option<TelegramChannelConfig>,
}

/// FCM push configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PushChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server_key: String,
}

/// SMTP email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_name: None,
        }
    }
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChannelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Chat to fall back to when no subscriber is registered.
    #[serde(default)]
    pub fallback_chat_id: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    2
}

impl Default for TelegramChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            fallback_chat_id: None,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DersBellConfig::default();
        assert_eq!(config.utc_offset_hours, 4);
        assert_eq!(config.triggers.reminder_cron, "*/5 * * * *");
        assert_eq!(config.notify.no_lesson_sentinel, "Dərs yoxdur");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: DersBellConfig = toml::from_str("").unwrap();
        assert_eq!(config.triggers.digest_cron, "0 20 * * *");
        assert_eq!(config.notify.send_timeout_secs, 10);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            utc_offset_hours = 2
            semester_start = "2026-02-09"

            [triggers]
            digest_cron = "30 19 * * *"

            [channel.telegram]
            enabled = true
            bot_token = "123:abc"
        "#;
        let config: DersBellConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.utc_offset_hours, 2);
        assert_eq!(
            config.semester_start,
            NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
        );
        assert_eq!(config.triggers.digest_cron, "30 19 * * *");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_channel_without_credentials_is_fatal() {
        let toml_str = r#"
            [channel.push]
            enabled = true
        "#;
        let config: DersBellConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_channel_is_fatal() {
        let config = DersBellConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timezone_out_of_range() {
        let config = DersBellConfig {
            utc_offset_hours: 99,
            ..Default::default()
        };
        assert!(config.timezone().is_err());
    }
}
