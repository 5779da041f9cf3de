use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default = "default_conversation_config")]
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives forwarded messages and whose replies are relayed back.
    #[serde(default)]
    pub admin_chat_id: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Six-field cron expression (seconds first) for the expiry sweep.
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_sweep_cron() -> String {
    "*/30 * * * * *".to_string()
}

fn default_conversation_config() -> ConversationConfig {
    ConversationConfig {
        idle_timeout_secs: default_idle_timeout_secs(),
        sweep_cron: default_sweep_cron(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig::default(),
            conversation: default_conversation_config(),
        }
    }
}

impl Config {
    /// Admin chat id, validated by `load`.
    pub fn admin_chat_id(&self) -> i64 {
        self.telegram.admin_chat_id.unwrap_or_default()
    }

    /// Idle timeout, validated by `load`; falls back to the default if unrepresentable.
    pub fn idle_timeout(&self) -> chrono::Duration {
        self.checked_idle_timeout().unwrap_or_else(|| {
            chrono::Duration::seconds(default_idle_timeout_secs() as i64)
        })
    }

    fn checked_idle_timeout(&self) -> Option<chrono::Duration> {
        let secs = i64::try_from(self.conversation.idle_timeout_secs).ok()?;
        chrono::Duration::try_seconds(secs)
    }

    /// Load the optional toml file at `path`, then apply `BOT_TOKEN` and
    /// `ADMIN_CHAT_ID` from the environment on top of it.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(
            std::env::var("BOT_TOKEN").ok(),
            std::env::var("ADMIN_CHAT_ID").ok(),
        )?;
        config.validate()?;
        Ok(config)
    }

    fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    fn apply_overrides(
        &mut self,
        bot_token: Option<String>,
        admin_chat_id: Option<String>,
    ) -> Result<()> {
        if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(raw) = admin_chat_id.filter(|v| !v.trim().is_empty()) {
            let id = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("ADMIN_CHAT_ID is not a numeric chat id: {raw}"))?;
            self.telegram.admin_chat_id = Some(id);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Bot token is missing: set BOT_TOKEN or [telegram] bot_token");
        }
        if self.telegram.admin_chat_id.is_none() {
            bail!("Admin chat id is missing: set ADMIN_CHAT_ID or [telegram] admin_chat_id");
        }
        if self.conversation.idle_timeout_secs == 0 {
            bail!("[conversation] idle_timeout_secs must be greater than zero");
        }
        if self.checked_idle_timeout().is_none() {
            bail!(
                "[conversation] idle_timeout_secs is out of range: {}",
                self.conversation.idle_timeout_secs
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.conversation.idle_timeout_secs, 300);
        assert_eq!(config.conversation.sweep_cron, "*/30 * * * * *");
        assert!(config.telegram.bot_token.is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_values_parsed() {
        let config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "123:abc"
            admin_chat_id = -100200300

            [conversation]
            idle_timeout_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.admin_chat_id(), -100200300);
        assert_eq!(config.idle_timeout(), chrono::Duration::seconds(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = Config::from_toml(
            r#"
            [telegram]
            bot_token = "from-file"
            admin_chat_id = 1
            "#,
        )
        .unwrap();
        config
            .apply_overrides(Some("from-env".into()), Some(" 42 ".into()))
            .unwrap();
        assert_eq!(config.telegram.bot_token, "from-env");
        assert_eq!(config.admin_chat_id(), 42);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.telegram.bot_token = "keep".into();
        config
            .apply_overrides(Some("  ".into()), Some(String::new()))
            .unwrap();
        assert_eq!(config.telegram.bot_token, "keep");
        assert!(config.telegram.admin_chat_id.is_none());
    }

    #[test]
    fn test_non_numeric_admin_id_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(None, Some("admin".into()))
            .unwrap_err();
        assert!(err.to_string().contains("ADMIN_CHAT_ID"));
    }

    #[test]
    fn test_missing_admin_id_fails_validation() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".into();
        assert!(config.validate().is_err());
        config.telegram.admin_chat_id = Some(7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_idle_timeout_rejected() {
        let mut config = Config::default();
        config.telegram.bot_token = "t".into();
        config.telegram.admin_chat_id = Some(7);

        config.conversation.idle_timeout_secs = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert_eq!(config.idle_timeout(), chrono::Duration::seconds(300));

        config.conversation.idle_timeout_secs = i64::MAX as u64;
        assert!(config.validate().is_err());

        config.conversation.idle_timeout_secs = 86_400;
        assert!(config.validate().is_ok());
        assert_eq!(config.idle_timeout(), chrono::Duration::days(1));
    }
}
