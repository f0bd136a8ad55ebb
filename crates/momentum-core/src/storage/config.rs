//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session defaults and watch pacing
//! - Pre-commitment defaults
//! - Notification preferences
//!
//! Configuration is stored at `~/.config/momentum/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::ledger::DEFAULT_FAILURE_REASON;
use crate::session::{DEFAULT_AUXILIARY_DURATION_MIN, DEFAULT_AUXILIARY_SIGNAL};

/// Focus session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Duration given to new chains when none is specified.
    #[serde(default = "default_session_duration")]
    pub default_duration_min: u32,
    /// Refresh interval of `session watch`.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// How often `session watch` sweeps expired pre-commitments.
    #[serde(default = "default_expiry_sweep")]
    pub expiry_sweep_secs: u64,
    #[serde(default = "default_failure_reason")]
    pub default_failure_reason: String,
}

/// Pre-commitment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxiliaryConfig {
    #[serde(default = "default_auxiliary_duration")]
    pub default_duration_min: u32,
    #[serde(default = "default_signal")]
    pub default_signal: String,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/momentum/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auxiliary: AuxiliaryConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

// Default functions
fn default_session_duration() -> u32 {
    25
}
fn default_tick_interval() -> u64 {
    1
}
fn default_expiry_sweep() -> u64 {
    30
}
fn default_failure_reason() -> String {
    DEFAULT_FAILURE_REASON.into()
}
fn default_auxiliary_duration() -> u32 {
    DEFAULT_AUXILIARY_DURATION_MIN
}
fn default_signal() -> String {
    DEFAULT_AUXILIARY_SIGNAL.into()
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_duration_min: default_session_duration(),
            tick_interval_secs: default_tick_interval(),
            expiry_sweep_secs: default_expiry_sweep(),
            default_failure_reason: default_failure_reason(),
        }
    }
}

impl Default for AuxiliaryConfig {
    fn default() -> Self {
        Self {
            default_duration_min: default_auxiliary_duration(),
            default_signal: default_signal(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("not a leaf setting".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing the default config on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        Ok(())
    }

    /// Every leaf setting as `(dot.path, value)`, sorted by key.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&path, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.session.default_duration_min, 25);
        assert_eq!(parsed.auxiliary.default_signal, "Scheduled signal");
        assert!(parsed.notifications.enabled);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[session]\ntick_interval_secs = 5\n").unwrap();
        assert_eq!(parsed.session.tick_interval_secs, 5);
        assert_eq!(parsed.session.expiry_sweep_secs, 30);
        assert_eq!(parsed.session.default_failure_reason, "Interrupted by user");
        assert_eq!(parsed.auxiliary.default_duration_min, 15);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("session.default_duration_min").as_deref(), Some("25"));
        assert_eq!(
            cfg.get("auxiliary.default_signal").as_deref(),
            Some("Scheduled signal")
        );
        assert!(cfg.get("session.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_each_value_kind() {
        let mut cfg = Config::default();
        cfg.set("notifications.enabled", "false").unwrap();
        cfg.set("session.expiry_sweep_secs", "10").unwrap();
        cfg.set("auxiliary.default_signal", "Stand up").unwrap();
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.session.expiry_sweep_secs, 10);
        assert_eq!(cfg.auxiliary.default_signal, "Stand up");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("session.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
        assert!(cfg.set("nope.at.all", "1").is_err());
        assert!(cfg.set("session", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let err = cfg.set("notifications.enabled", "not_a_bool").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("session.tick_interval_secs", "-3").is_err());
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.session.default_duration_min, 25);
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("session.default_duration_min", "50").unwrap();
        changed.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.session.default_duration_min, 50);
    }

    #[test]
    fn load_from_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn entries_lists_every_leaf() {
        let entries = Config::default().entries();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"session.default_duration_min"));
        assert!(keys.contains(&"auxiliary.default_signal"));
        assert!(keys.contains(&"notifications.enabled"));
        assert_eq!(entries.len(), 7);
    }
}
