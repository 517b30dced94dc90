//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::channels::DiscordConfig;
use crate::emoji::DEFAULT_MAX_EMOJIS;
use crate::error::ConfigError;
use crate::pipeline::ProcessorConfig;
use crate::pipeline::types::{DEFAULT_ANALYSIS_TIMEOUT, DEFAULT_MAX_IMAGE_SIZE};
use crate::vision::{DEFAULT_VISION_MODEL, VisionConfig};

const REQUIRED_KEYS: &[&str] = &["DISCORD_TOKEN", "TARGET_CHANNEL_ID", "OPENAI_API_KEY"];

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: SecretString,
    /// Only messages in this channel are processed.
    pub target_channel_id: String,
    pub openai_api_key: SecretString,
    /// Largest attachment downloaded, in bytes.
    pub max_image_size: u64,
    /// Bounds both the download and the vision call.
    pub analysis_timeout: Duration,
    pub max_emojis: usize,
    /// Lowercase `tracing` level name.
    pub log_level: String,
    pub log_dir: PathBuf,
    pub vision_model: String,
    /// Users allowed to edit the keyword table (`*` = everyone).
    pub admin_user_ids: Vec<String>,
}

impl BotConfig {
    /// Load from the process environment, after an optional `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let discord_token = get("DISCORD_TOKEN").unwrap_or_default();
        let openai_api_key = get("OPENAI_API_KEY").unwrap_or_default();
        let target_channel_id = get("TARGET_CHANNEL_ID").unwrap_or_default();
        if target_channel_id.parse::<u64>().is_err() {
            return Err(ConfigError::InvalidValue {
                key: "TARGET_CHANNEL_ID".into(),
                message: format!("expected a numeric channel id, got '{target_channel_id}'"),
            });
        }

        let max_image_size = parse_or(
            "MAX_IMAGE_SIZE",
            get("MAX_IMAGE_SIZE"),
            DEFAULT_MAX_IMAGE_SIZE,
        )?;
        let timeout_secs = parse_or(
            "ANALYSIS_TIMEOUT",
            get("ANALYSIS_TIMEOUT"),
            DEFAULT_ANALYSIS_TIMEOUT.as_secs(),
        )?;
        let max_emojis = parse_or(
            "MAX_EMOJIS_PER_IMAGE",
            get("MAX_EMOJIS_PER_IMAGE"),
            DEFAULT_MAX_EMOJIS,
        )?;
        let log_level = normalize_level(get("LOG_LEVEL").as_deref().unwrap_or("INFO"))?;

        let admin_user_ids = get("ADMIN_USER_IDS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            discord_token: SecretString::from(discord_token),
            target_channel_id,
            openai_api_key: SecretString::from(openai_api_key),
            max_image_size,
            analysis_timeout: Duration::from_secs(timeout_secs),
            max_emojis,
            log_level,
            log_dir: get("LOG_DIR").map_or_else(|| PathBuf::from("logs"), PathBuf::from),
            vision_model: get("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            admin_user_ids,
        })
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_image_size: self.max_image_size,
            analysis_timeout: self.analysis_timeout,
            max_emojis: self.max_emojis,
            ..ProcessorConfig::default()
        }
    }

    pub fn vision_config(&self) -> VisionConfig {
        VisionConfig::new(self.openai_api_key.clone()).with_model(self.vision_model.clone())
    }

    pub fn discord_config(&self) -> DiscordConfig {
        DiscordConfig::new(self.discord_token.clone())
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a non-negative integer, got '{raw}'"),
        }),
    }
}

/// Map a level name (any case, including `WARNING` and `CRITICAL`) to a
/// `tracing` level directive.
fn normalize_level(raw: &str) -> Result<String, ConfigError> {
    let level = match raw.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "critical" => "error",
        _ => {
            return Err(ConfigError::InvalidValue {
                key: "LOG_LEVEL".into(),
                message: format!("unknown level '{raw}'"),
            });
        }
    };
    Ok(level.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "discord-token"),
        ("TARGET_CHANNEL_ID", "1234567890"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn defaults_apply() {
        let config = BotConfig::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.discord_token.expose_secret(), "discord-token");
        assert_eq!(config.target_channel_id, "1234567890");
        assert_eq!(config.max_image_size, 10_485_760);
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.max_emojis, 3);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.vision_model, "gpt-4o");
        assert!(config.admin_user_ids.is_empty());
    }

    #[test]
    fn missing_keys_reported_together() {
        let err = BotConfig::from_lookup(lookup(&[("TARGET_CHANNEL_ID", "1")])).unwrap_err();
        match err {
            ConfigError::MissingRequired(keys) => {
                assert_eq!(keys, ["DISCORD_TOKEN", "OPENAI_API_KEY"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("DISCORD_TOKEN", "   ");
        assert!(matches!(
            BotConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::MissingRequired(keys)) if keys == ["DISCORD_TOKEN"]
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("MAX_IMAGE_SIZE", "2048"),
            ("ANALYSIS_TIMEOUT", "5"),
            ("MAX_EMOJIS_PER_IMAGE", "1"),
            ("LOG_LEVEL", "WARNING"),
            ("LOG_DIR", "/var/log/reactor"),
            ("VISION_MODEL", "gpt-4o-mini"),
            ("ADMIN_USER_IDS", "42, 43 ,"),
        ]);
        let config = BotConfig::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(config.max_image_size, 2048);
        assert_eq!(config.analysis_timeout, Duration::from_secs(5));
        assert_eq!(config.max_emojis, 1);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/reactor"));
        assert_eq!(config.vision_model, "gpt-4o-mini");
        assert_eq!(config.admin_user_ids, ["42", "43"]);

        let processor = config.processor_config();
        assert_eq!(processor.max_image_size, 2048);
        assert_eq!(processor.analysis_timeout, Duration::from_secs(5));
        assert_eq!(processor.max_emojis, 1);
        assert_eq!(config.vision_config().model, "gpt-4o-mini");
    }

    #[test]
    fn non_numeric_values_rejected() {
        for (key, value) in [
            ("MAX_IMAGE_SIZE", "ten"),
            ("ANALYSIS_TIMEOUT", "-1"),
            ("MAX_EMOJIS_PER_IMAGE", "3.5"),
            ("TARGET_CHANNEL_ID", "general"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.retain(|(k, _)| *k != key);
            pairs.push((key, value));
            match BotConfig::from_lookup(lookup(&pairs)) {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("{key}: unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_log_level_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("LOG_LEVEL", "LOUD"));
        assert!(matches!(
            BotConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::InvalidValue { key, .. }) if key == "LOG_LEVEL"
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = BotConfig::from_lookup(lookup(REQUIRED)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("discord-token"));
        assert!(!debug.contains("sk-test"));
    }
}
