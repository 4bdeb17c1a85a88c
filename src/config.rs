//! Daemon configuration.
//!
//! Read once at startup from `$XDG_CONFIG_HOME/padmouse/config.toml`, or from
//! the file named by `PADMOUSE_CONFIG`. A missing file means defaults; a file
//! that does not parse or validate stops the daemon before any device is
//! touched. The button mapping itself is fixed and not part of the file.

use crate::translate::{AxisAccelerator, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_ENV: &str = "PADMOUSE_CONFIG";
const CONFIG_DIR: &str = "padmouse";
const CONFIG_FILE: &str = "config.toml";

/// Why a configuration file was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

/// Where gamepads are searched for and what the virtual device is called.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct DeviceConfig {
    /// Directory holding `eventN` nodes.
    pub dir: PathBuf,
    /// Nodes `event0` up to (excluding) `event{scan_limit}` are probed.
    pub scan_limit: u32,
    /// Name the virtual pointer registers under.
    pub virtual_name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/dev/input"),
            scan_limit: 32,
            virtual_name: "Padmouse Virtual Input".to_string(),
        }
    }
}

/// Per-session timing.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SessionConfig {
    /// Re-evaluation interval while a stick is deflected.
    pub motion_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            motion_interval_ms: 20,
        }
    }
}

/// The whole configuration file. Every section is optional.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    /// Movement stick curve. A section given in the file must be complete.
    pub pointer: AxisAccelerator,
    /// Scroll stick curve. A section given in the file must be complete.
    pub scroll: AxisAccelerator,
    pub triggers: Thresholds,
    pub session: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            pointer: AxisAccelerator::pointer(),
            scroll: AxisAccelerator::scroll(),
            triggers: Thresholds::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from its default location.
    pub async fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).await,
            None => {
                warn!("No configuration directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `PADMOUSE_CONFIG` if set, otherwise the per-user config file.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads and validates `path`. A missing file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            })?;
        if !exists {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source,
                })?;
        let config = Self::parse(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        info!("Loaded config from {}", path.display());
        debug!("Effective config: {:?}", config);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Rejects curves that cannot be evaluated, inverted trigger thresholds
    /// and a zero motion interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pointer
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("pointer: {e}")))?;
        self.scroll
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("scroll: {e}")))?;

        if self.triggers.release >= self.triggers.press {
            return Err(ConfigError::InvalidValue(format!(
                "triggers: release threshold {} must be below press threshold {}",
                self.triggers.release, self.triggers.press
            )));
        }
        if self.session.motion_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "session: motion_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn motion_interval(&self) -> Duration {
        Duration::from_millis(self.session.motion_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.pointer, AxisAccelerator::pointer());
        assert_eq!(config.scroll, AxisAccelerator::scroll());
        assert_eq!(config.triggers, Thresholds::default());
        assert_eq!(config.device.dir, PathBuf::from("/dev/input"));
        assert_eq!(config.device.scan_limit, 32);
        assert_eq!(config.motion_interval(), Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_fill_in() {
        let config = Config::parse(
            r#"
            [device]
            scan_limit = 8

            [triggers]
            press = 700

            [scroll]
            base = 1.02
            deadzone = 4096
            divisor = 256
            normalization = 68719476736
            multiplier = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.device.scan_limit, 8);
        assert_eq!(config.device.virtual_name, "Padmouse Virtual Input");
        assert_eq!(config.triggers.press, 700);
        assert_eq!(config.triggers.release, 256);
        assert_eq!(config.scroll.multiplier, 3);
        assert_eq!(config.pointer, AxisAccelerator::pointer());
    }

    #[test]
    fn incomplete_curve_is_rejected() {
        assert!(Config::parse("[pointer]\nbase = 1.05\n").is_err());
    }

    #[test]
    fn inverted_trigger_thresholds_are_rejected() {
        let config = Config::parse("[triggers]\npress = 100\nrelease = 200\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.device.scan_limit, 32);
    }

    #[tokio::test]
    async fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[device\nscan_limit = ").unwrap();

        let err = Config::load_from(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[tokio::test]
    async fn file_values_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nmotion_interval_ms = 0\n").unwrap();

        let err = Config::load_from(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
