//! Trade settings.
//!
//! Settings live in a small JSON file next to the binary's working
//! directory. Missing files are created with defaults; environment
//! variables override file values at load time. Individual settings can be
//! read and changed at runtime by name, mirroring the in-game config
//! command.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TradeError};
use crate::ports::SettingsProvider;

/// Setting name for the offer timeout.
pub const KEY_TIMEOUT: &str = "timeout";
/// Setting name for the cooldown length.
pub const KEY_COOLDOWN: &str = "cooldown";
/// Setting name for the cooldown mode.
pub const KEY_COOLDOWN_MODE: &str = "cooldown-mode";

/// All setting names, in display order.
pub const SETTING_KEYS: [&str; 3] = [KEY_TIMEOUT, KEY_COOLDOWN, KEY_COOLDOWN_MODE];

/// Upper bound for second-valued settings (millisecond math must not overflow).
const MAX_SECS: u64 = u64::MAX / 1000;

/// Who is put on cooldown after a completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CooldownMode {
    /// Only the player who sent the request.
    #[default]
    WhoInitiated,
    /// Both players.
    BothUsers,
}

impl FromStr for CooldownMode {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "whoinitiated" => Ok(CooldownMode::WhoInitiated),
            "bothusers" => Ok(CooldownMode::BothUsers),
            _ => Err(TradeError::InvalidConfig {
                key: KEY_COOLDOWN_MODE.to_string(),
                reason: format!("expected WhoInitiated or BothUsers, got {s:?}"),
            }),
        }
    }
}

impl fmt::Display for CooldownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CooldownMode::WhoInitiated => write!(f, "WhoInitiated"),
            CooldownMode::BothUsers => write!(f, "BothUsers"),
        }
    }
}

/// Trade negotiation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeSettings {
    /// Seconds before an unanswered request expires.
    pub timeout_secs: u64,

    /// Seconds a player must wait after a completed trade before sending a new request.
    pub cooldown_secs: u64,

    /// Who the cooldown applies to.
    pub cooldown_mode: CooldownMode,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            cooldown_secs: 60,
            cooldown_mode: CooldownMode::WhoInitiated,
        }
    }
}

impl TradeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Validate every field.
    pub fn validate(&self) -> Result<()> {
        validate_secs(KEY_TIMEOUT, self.timeout_secs)?;
        validate_secs(KEY_COOLDOWN, self.cooldown_secs)?;
        Ok(())
    }

    /// Read a setting by name as display text.
    pub fn get(&self, key: &str) -> Result<String> {
        match key {
            KEY_TIMEOUT => Ok(self.timeout_secs.to_string()),
            KEY_COOLDOWN => Ok(self.cooldown_secs.to_string()),
            KEY_COOLDOWN_MODE => Ok(self.cooldown_mode.to_string()),
            _ => Err(TradeError::UnknownSetting(key.to_string())),
        }
    }

    /// Parse and apply a setting by name. Leaves `self` untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            KEY_TIMEOUT => self.timeout_secs = parse_secs(KEY_TIMEOUT, value)?,
            KEY_COOLDOWN => self.cooldown_secs = parse_secs(KEY_COOLDOWN, value)?,
            KEY_COOLDOWN_MODE => self.cooldown_mode = value.parse()?,
            _ => return Err(TradeError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }

    /// Human-readable description of a setting's current value.
    pub fn describe(&self, key: &str) -> Result<String> {
        let value = self.get(key)?;
        Ok(match key {
            KEY_TIMEOUT => format!("Timeout is {value} seconds"),
            KEY_COOLDOWN => format!("Cooldown is {value} seconds"),
            _ => format!("Cooldown Mode is {value}"),
        })
    }

    /// Apply `TRADE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("TRADE_TIMEOUT_SECS") {
            self.set(KEY_TIMEOUT, &v)?;
        }
        if let Ok(v) = std::env::var("TRADE_COOLDOWN_SECS") {
            self.set(KEY_COOLDOWN, &v)?;
        }
        if let Ok(v) = std::env::var("TRADE_COOLDOWN_MODE") {
            self.set(KEY_COOLDOWN_MODE, &v)?;
        }
        Ok(())
    }
}

impl SettingsProvider for TradeSettings {
    fn settings(&self) -> TradeSettings {
        *self
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|e| TradeError::InvalidConfig {
            key: key.to_string(),
            reason: format!("expected a non-negative integer: {e}"),
        })?;
    validate_secs(key, secs)?;
    Ok(secs)
}

fn validate_secs(key: &str, secs: u64) -> Result<()> {
    if secs > MAX_SECS {
        return Err(TradeError::InvalidConfig {
            key: key.to_string(),
            reason: format!("must be at most {MAX_SECS}"),
        });
    }
    Ok(())
}

/// Live settings shared by the registry and the config command.
///
/// Every successful `set` is written back to the backing file, if any.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<TradeSettings>,
}

impl SettingsStore {
    /// Store without a backing file.
    pub fn in_memory(settings: TradeSettings) -> Self {
        Self {
            path: None,
            current: RwLock::new(settings),
        }
    }

    /// Load settings from `path`, creating the file with defaults if absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            serde_json::from_str::<TradeSettings>(&content)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?
        } else {
            tracing::info!("Settings file {} not found, writing defaults", path.display());
            let defaults = TradeSettings::default();
            write_settings(&path, &defaults)
                .with_context(|| format!("Failed to write settings file {}", path.display()))?;
            defaults
        };

        settings
            .apply_env_overrides()
            .context("Invalid TRADE_* environment override")?;
        settings.validate().context("Invalid trade settings")?;

        Ok(Self {
            path: Some(path),
            current: RwLock::new(settings),
        })
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> TradeSettings {
        *self.current.read()
    }

    /// Read a setting by name.
    pub fn get(&self, key: &str) -> Result<String> {
        self.current.read().get(key)
    }

    /// Change a setting by name and persist it.
    pub fn set(&self, key: &str, value: &str) -> Result<TradeSettings> {
        let mut current = self.current.write();
        let mut updated = *current;
        if let Err(e) = updated.set(key, value) {
            tracing::warn!("Rejected setting {}={}: {}", key, value, e);
            return Err(e);
        }
        if let Some(path) = &self.path {
            write_settings(path, &updated)?;
        }
        *current = updated;
        tracing::info!("Setting {} changed to {}", key, value);
        Ok(updated)
    }
}

impl SettingsProvider for SettingsStore {
    fn settings(&self) -> TradeSettings {
        self.snapshot()
    }
}

fn write_settings(path: &Path, settings: &TradeSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = TradeSettings::default();
        assert_eq!(settings.timeout_secs, 60);
        assert_eq!(settings.cooldown_secs, 60);
        assert_eq!(settings.cooldown_mode, CooldownMode::WhoInitiated);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_set_by_name() {
        let mut settings = TradeSettings::default();

        settings.set("timeout", "30").unwrap();
        settings.set("cooldown", "0").unwrap();
        settings.set("cooldown-mode", "bothusers").unwrap();

        assert_eq!(settings.timeout(), Duration::from_secs(30));
        assert_eq!(settings.cooldown(), Duration::ZERO);
        assert_eq!(settings.cooldown_mode, CooldownMode::BothUsers);
        assert_eq!(settings.get("cooldown-mode").unwrap(), "BothUsers");
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = TradeSettings::default();

        assert!(matches!(
            settings.set("timeout", "-5"),
            Err(TradeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            settings.set("cooldown-mode", "Everyone"),
            Err(TradeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            settings.set("speed", "1"),
            Err(TradeError::UnknownSetting(_))
        ));
        assert_eq!(settings, TradeSettings::default());
    }

    #[test]
    fn test_describe() {
        let settings = TradeSettings::default();
        assert_eq!(settings.describe("timeout").unwrap(), "Timeout is 60 seconds");
        assert_eq!(
            settings.describe("cooldown-mode").unwrap(),
            "Cooldown Mode is WhoInitiated"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: TradeSettings = serde_json::from_str(r#"{"timeout_secs": 15}"#).unwrap();
        assert_eq!(settings.timeout_secs, 15);
        assert_eq!(settings.cooldown_secs, 60);
    }

    #[test]
    fn test_load_creates_file_and_persists_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade.json");

        let store = SettingsStore::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));

        store.set("cooldown", "120").unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.snapshot().cooldown_secs, 120);
    }

    #[test]
    fn test_failed_set_keeps_previous_value() {
        let store = SettingsStore::in_memory(TradeSettings::default());
        assert!(store.set("timeout", "soon").is_err());
        assert_eq!(store.get("timeout").unwrap(), "60");
        assert_eq!(store.settings(), TradeSettings::default());
    }

    #[test]
    fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(SettingsStore::load(&path).is_err());
    }
}
