//! Persistent settings shared between runs.
//!
//! Stored as a small pretty-printed JSON object. The file is written by whoever owns the
//! settings (the CLI, a GUI); the session client itself never persists anything.

use crate::streamlabs_api::AudienceType;
use eyre::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// File name used when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Stream title used when going live.
    #[serde(deserialize_with = "or_default")]
    pub title: String,
    /// Category display name; resolved to a `game_mask_id` before going live.
    #[serde(deserialize_with = "or_default")]
    pub game: String,
    #[serde(deserialize_with = "or_default")]
    pub audience_type: AudienceType,
    /// Streamlabs API token. Empty when none has been obtained yet.
    #[serde(deserialize_with = "or_default")]
    pub token: String,
    #[serde(deserialize_with = "or_default")]
    pub suppress_donation_reminder: bool,
}

/// Reads one field, replacing a value of the wrong shape with the field's default so that the
/// remaining settings survive.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring invalid config value");
        T::default()
    }))
}

impl Config {
    /// Reads the configuration at `path`.
    ///
    /// A missing file yields the defaults. So does an unreadable or corrupt one, after a
    /// warning, so that a bad file never prevents startup.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "read config file");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt config file");
                Self::default()
            }
        }
    }

    /// Writes the configuration to `path`, replacing any previous contents.
    pub async fn save(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("write config to {}", path.display()))?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            title: "Friday night".to_string(),
            game: "Minecraft".to_string(),
            audience_type: AudienceType::Mature,
            token: "abc123".to_string(),
            suppress_donation_reminder: true,
        };
        config.save(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["audience_type"], "1");
        assert_eq!(raw["token"], "abc123");

        assert_eq!(Config::load(&path).await, config);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("nope.json")).await;
        assert_eq!(config, Config::default());
        assert!(!config.has_token());
    }

    #[tokio::test]
    async fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load(&path).await, Config::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token": "feed", "audience_type": "1"}"#).unwrap();

        let config = Config::load(&path).await;
        assert_eq!(config.token, "feed");
        assert_eq!(config.audience_type, AudienceType::Mature);
        assert_eq!(config.title, "");
        assert!(!config.suppress_donation_reminder);
        assert!(config.has_token());
    }

    #[tokio::test]
    async fn test_invalid_field_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"token": "feed", "title": "t", "game": 7, "audience_type": "2", "suppress_donation_reminder": "yes"}"#,
        )
        .unwrap();

        let config = Config::load(&path).await;
        assert_eq!(config.token, "feed");
        assert_eq!(config.title, "t");
        assert_eq!(config.game, "");
        assert_eq!(config.audience_type, AudienceType::General);
        assert!(!config.suppress_donation_reminder);
    }
}
