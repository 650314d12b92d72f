//! Forum configuration and the settings providers it is read from.
//!
//! Configuration is never cached: every operation calls [`ForumConfig::load`]
//! again, so a setting changed at runtime applies to the next invocation.

use crate::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

pub const FORUM_API_BASE_URL: &str = "FORUM_API_BASE_URL";
pub const FORUM_ACCESS_TOKEN: &str = "FORUM_ACCESS_TOKEN";
pub const FORUM_REFRESH_TOKEN: &str = "FORUM_REFRESH_TOKEN";
pub const ENABLE_FORUM_POST_GENERATION: &str = "ENABLE_FORUM_POST_GENERATION";
pub const FORUM_POST_INTERVAL_MIN: &str = "FORUM_POST_INTERVAL_MIN";
pub const FORUM_POST_INTERVAL_MAX: &str = "FORUM_POST_INTERVAL_MAX";
pub const FORUM_TOKENS_FILE: &str = "FORUM_TOKENS_FILE";

pub const DEFAULT_API_BASE_URL: &str = "https://otlaw-api-gateway.dev.mwancloud.com/api";
pub const DEFAULT_INTERVAL_MIN_MINUTES: u64 = 90;
pub const DEFAULT_INTERVAL_MAX_MINUTES: u64 = 180;
/// One year.
pub const MAX_INTERVAL_MINUTES: u64 = 525_600;

/// Source of string settings, layered the way the agent runtime resolves them.
pub trait SettingsProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Record a value for the rest of the process lifetime.
    fn set(&self, key: &str, value: &str);
}

/// In-memory settings.
#[derive(Debug, Default)]
pub struct MapSettings {
    values: RwLock<HashMap<String, String>>,
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }
}

impl SettingsProvider for MapSettings {
    fn get(&self, key: &str) -> Option<String> {
        match self.values.read() {
            Ok(values) => values.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = match self.values.write() {
            Ok(values) => values,
            Err(poisoned) => poisoned.into_inner(),
        };
        values.insert(key.to_string(), value.to_string());
    }
}

/// Runtime overrides, then process environment, then the character's
/// `[settings]` table.
#[derive(Debug, Default)]
pub struct EnvSettings {
    overrides: MapSettings,
    character_settings: HashMap<String, String>,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_character_settings(mut self, settings: HashMap<String, String>) -> Self {
        self.character_settings = settings;
        self
    }
}

impl SettingsProvider for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.overrides
            .get(key)
            .or_else(|| std::env::var(key).ok())
            .or_else(|| self.character_settings.get(key).cloned())
            .filter(|value| !value.is_empty())
    }

    fn set(&self, key: &str, value: &str) {
        self.overrides.set(key, value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumConfig {
    pub api_base_url: String,
    pub access_token: String,
    pub refresh_token: String,
    pub enable_auto_post: bool,
    pub post_interval_min_minutes: u64,
    pub post_interval_max_minutes: u64,
}

impl ForumConfig {
    pub fn load(settings: &dyn SettingsProvider) -> Result<Self, ConfigError> {
        let api_base_url = settings
            .get(FORUM_API_BASE_URL)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        url::Url::parse(&api_base_url).map_err(|_| ConfigError::InvalidValue {
            field: FORUM_API_BASE_URL.to_string(),
            value: api_base_url.clone(),
        })?;

        let access_token = required(settings, FORUM_ACCESS_TOKEN)?;
        let refresh_token = required(settings, FORUM_REFRESH_TOKEN)?;

        let enable_auto_post =
            settings.get(ENABLE_FORUM_POST_GENERATION).as_deref() == Some("true");

        let post_interval_min_minutes =
            minutes(settings, FORUM_POST_INTERVAL_MIN, DEFAULT_INTERVAL_MIN_MINUTES)?;
        let mut post_interval_max_minutes =
            minutes(settings, FORUM_POST_INTERVAL_MAX, DEFAULT_INTERVAL_MAX_MINUTES)?;
        if post_interval_min_minutes > post_interval_max_minutes {
            warn!(
                "{} ({}) is greater than {} ({}), clamping the maximum",
                FORUM_POST_INTERVAL_MIN,
                post_interval_min_minutes,
                FORUM_POST_INTERVAL_MAX,
                post_interval_max_minutes
            );
            post_interval_max_minutes = post_interval_min_minutes;
        }

        debug!(
            "Loaded forum config: base URL {}, auto post {}",
            api_base_url, enable_auto_post
        );

        Ok(Self {
            api_base_url,
            access_token,
            refresh_token,
            enable_auto_post,
            post_interval_min_minutes,
            post_interval_max_minutes,
        })
    }

    pub fn interval_min(&self) -> Duration {
        Duration::from_secs(self.post_interval_min_minutes.saturating_mul(60))
    }

    pub fn interval_max(&self) -> Duration {
        Duration::from_secs(self.post_interval_max_minutes.saturating_mul(60))
    }
}

fn required(settings: &dyn SettingsProvider, key: &str) -> Result<String, ConfigError> {
    settings
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: key.to_string(),
        })
}

fn minutes(settings: &dyn SettingsProvider, key: &str, default: u64) -> Result<u64, ConfigError> {
    match settings.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|minutes| *minutes <= MAX_INTERVAL_MINUTES)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw,
            }),
    }
}

/// The agent persona used when composing generated posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub bio: Vec<String>,
    #[serde(default)]
    pub style: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl Character {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> MapSettings {
        MapSettings::new()
            .with(FORUM_ACCESS_TOKEN, "access")
            .with(FORUM_REFRESH_TOKEN, "refresh")
    }

    #[test]
    fn test_defaults_apply() {
        let config = ForumConfig::load(&base_settings()).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!config.enable_auto_post);
        assert_eq!(config.post_interval_min_minutes, 90);
        assert_eq!(config.post_interval_max_minutes, 180);
        assert_eq!(config.interval_min(), Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_missing_tokens_are_rejected() {
        let settings = MapSettings::new().with(FORUM_ACCESS_TOKEN, "access");
        let err = ForumConfig::load(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field } if field == FORUM_REFRESH_TOKEN));

        let settings = base_settings().with(FORUM_ACCESS_TOKEN, "   ");
        assert!(ForumConfig::load(&settings).is_err());
    }

    #[test]
    fn test_only_literal_true_enables_generation() {
        let settings = base_settings().with(ENABLE_FORUM_POST_GENERATION, "TRUE");
        assert!(!ForumConfig::load(&settings).unwrap().enable_auto_post);

        settings.set(ENABLE_FORUM_POST_GENERATION, "true");
        assert!(ForumConfig::load(&settings).unwrap().enable_auto_post);
    }

    #[test]
    fn test_invalid_intervals() {
        let settings = base_settings().with(FORUM_POST_INTERVAL_MIN, "soon");
        assert!(matches!(
            ForumConfig::load(&settings),
            Err(ConfigError::InvalidValue { .. })
        ));

        let settings = base_settings().with(FORUM_POST_INTERVAL_MAX, "307445734561825861");
        assert!(matches!(
            ForumConfig::load(&settings),
            Err(ConfigError::InvalidValue { field, .. }) if field == FORUM_POST_INTERVAL_MAX
        ));
    }

    #[test]
    fn test_longest_interval_converts_without_overflow() {
        let limit = MAX_INTERVAL_MINUTES.to_string();
        let settings = base_settings()
            .with(FORUM_POST_INTERVAL_MIN, &limit)
            .with(FORUM_POST_INTERVAL_MAX, &limit);
        let config = ForumConfig::load(&settings).unwrap();
        assert_eq!(
            config.interval_max(),
            Duration::from_secs(MAX_INTERVAL_MINUTES * 60)
        );
    }

    #[test]
    fn test_inverted_interval_is_clamped() {
        let settings = base_settings()
            .with(FORUM_POST_INTERVAL_MIN, "200")
            .with(FORUM_POST_INTERVAL_MAX, "100");
        let config = ForumConfig::load(&settings).unwrap();
        assert_eq!(config.post_interval_min_minutes, 200);
        assert_eq!(config.post_interval_max_minutes, 200);
    }

    #[test]
    fn test_reload_sees_updated_setting() {
        let settings = base_settings();
        assert_eq!(ForumConfig::load(&settings).unwrap().access_token, "access");
        settings.set(FORUM_ACCESS_TOKEN, "rotated");
        assert_eq!(ForumConfig::load(&settings).unwrap().access_token, "rotated");
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = base_settings().with(FORUM_API_BASE_URL, "not a url");
        assert!(ForumConfig::load(&settings).is_err());
    }

    #[test]
    fn test_env_settings_prefers_overrides_then_character() {
        let mut character = HashMap::new();
        character.insert("FORUM_TEST_ONLY_KEY".to_string(), "from-character".to_string());
        let settings = EnvSettings::new().with_character_settings(character);
        assert_eq!(
            settings.get("FORUM_TEST_ONLY_KEY").as_deref(),
            Some("from-character")
        );

        settings.set("FORUM_TEST_ONLY_KEY", "override");
        assert_eq!(settings.get("FORUM_TEST_ONLY_KEY").as_deref(), Some("override"));
    }

    #[test]
    fn test_character_from_toml() {
        let character = Character::from_toml_str(
            r#"
            name = "Eliza"
            bio = ["Curious about technology"]
            topics = ["AI", "Robotics"]

            [settings]
            ENABLE_FORUM_POST_GENERATION = "true"
            "#,
        )
        .unwrap();
        assert_eq!(character.name, "Eliza");
        assert_eq!(character.topics.len(), 2);
        assert_eq!(
            character.settings.get(ENABLE_FORUM_POST_GENERATION).map(String::as_str),
            Some("true")
        );
        assert!(Character::from_toml_str("name = ").is_err());
    }
}
