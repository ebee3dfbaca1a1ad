//! Configuration for the lockdown monitor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Strictness of the lockdown. Only `High` suppresses selection and drag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Low => f.write_str("low"),
            SecurityLevel::Medium => f.write_str("medium"),
            SecurityLevel::High => f.write_str("high"),
        }
    }
}

impl FromStr for SecurityLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(SecurityLevel::Low),
            "medium" => Ok(SecurityLevel::Medium),
            "high" => Ok(SecurityLevel::High),
            other => Err(ConfigError::Parse(format!("unknown security level '{other}'"))),
        }
    }
}

/// Main configuration for a lockdown session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockdownConfig {
    pub security_level: SecurityLevel,

    /// Block capture combos (PrintScreen, screenshot chords)
    pub enable_screenshot_prevention: bool,

    /// Block dev-tool and navigation combos
    pub enable_keyboard_blocking: bool,

    /// Run the visibility/focus detector
    pub enable_tab_switch_detection: bool,

    /// Block clipboard combos
    pub enable_copy_paste_prevention: bool,

    /// How often the dev-tools heuristic polls window metrics
    #[serde(with = "duration_millis")]
    pub devtools_poll_interval: Duration,

    /// Chrome size, in pixels, above which dev tools are considered open
    pub devtools_threshold_px: f64,

    /// Absence after which a focus regain is reported
    #[serde(with = "duration_millis")]
    pub focus_return_threshold: Duration,

    /// How often the console deterrent is re-issued
    #[serde(with = "duration_millis")]
    pub advisory_interval: Duration,

    /// Directory for exported session reports
    pub export_path: PathBuf,

    /// Directory for local state
    pub data_path: PathBuf,
}

impl Default for LockdownConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lockdown-monitor");

        Self {
            security_level: SecurityLevel::default(),
            enable_screenshot_prevention: true,
            enable_keyboard_blocking: true,
            enable_tab_switch_detection: true,
            enable_copy_paste_prevention: true,
            devtools_poll_interval: Duration::from_millis(500),
            devtools_threshold_px: 160.0,
            focus_return_threshold: Duration::from_secs(3),
            advisory_interval: Duration::from_secs(10),
            export_path: data_dir.join("reports"),
            data_path: data_dir,
        }
    }
}

impl LockdownConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: LockdownConfig =
                serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lockdown-monitor")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    /// Whether any keyboard combo group is active.
    pub fn any_key_blocking(&self) -> bool {
        self.enable_screenshot_prevention
            || self.enable_keyboard_blocking
            || self.enable_copy_paste_prevention
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LockdownConfig::default();
        assert_eq!(config.security_level, SecurityLevel::Medium);
        assert_eq!(config.devtools_poll_interval, Duration::from_millis(500));
        assert_eq!(config.devtools_threshold_px, 160.0);
        assert_eq!(config.focus_return_threshold, Duration::from_secs(3));
        assert_eq!(config.advisory_interval, Duration::from_secs(10));
        assert!(config.enable_tab_switch_detection);
        assert!(config.any_key_blocking());
    }

    #[test]
    fn test_security_level_parsing() {
        assert_eq!("HIGH".parse::<SecurityLevel>().unwrap(), SecurityLevel::High);
        assert_eq!(" low ".parse::<SecurityLevel>().unwrap(), SecurityLevel::Low);
        assert!("paranoid".parse::<SecurityLevel>().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"security_level":"high","enable_copy_paste_prevention":false}"#;
        let config: LockdownConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.security_level, SecurityLevel::High);
        assert!(!config.enable_copy_paste_prevention);
        assert!(config.enable_keyboard_blocking);
        assert_eq!(config.devtools_poll_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = LockdownConfig::default();
        config.security_level = SecurityLevel::Low;
        config.focus_return_threshold = Duration::from_millis(4500);
        config.save_to(&path).unwrap();

        let loaded = LockdownConfig::load_from(&path).unwrap();
        assert_eq!(loaded.security_level, SecurityLevel::Low);
        assert_eq!(loaded.focus_return_threshold, Duration::from_millis(4500));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LockdownConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.security_level, SecurityLevel::Medium);
    }
}
