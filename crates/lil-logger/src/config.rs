//! Runtime configuration.
//!
//! The mode, timestamp and level settings come from the environment and are
//! read once when the global registry is first used. Directory names can also
//! be set from an optional `lil-logger.toml` file or at runtime through
//! [`set_dirs`](crate::set_dirs).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::backend::{Level, LogFormat};

/// The config file name
pub const CONFIG_FILE_NAME: &str = "lil-logger.toml";

pub const ENV_MODE: &str = "LIL_LOGGER_ENV";
pub const ENV_MODE_FALLBACK: &str = "APP_ENV";
pub const ENV_TIMESTAMP: &str = "LIL_LOGGER_TIMESTAMP";
pub const ENV_LEVEL: &str = "LIL_LOGGER_LEVEL";
pub const ENV_FILE: &str = "LIL_LOGGER_FILE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Development or production layout. Fixed for the life of a registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    /// `production` (any case) is production; everything else is development.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("production") => Mode::Production,
            _ => Mode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }
}

/// Source and build-output directory names, relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirConfig {
    pub dev_dir: String,
    pub prod_dir: String,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            dev_dir: "src".to_string(),
            prod_dir: "dist".to_string(),
        }
    }
}

impl DirConfig {
    pub fn new(dev_dir: impl Into<String>, prod_dir: impl Into<String>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            prod_dir: prod_dir.into(),
        }
    }
}

/// Settings taken from the process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub mode: Mode,
    /// Whether records carry a timestamp. Defaults to on in development and
    /// off in production.
    pub timestamp: bool,
    pub level: Level,
    /// Optional file that receives a JSON copy of every record.
    pub file: Option<PathBuf>,
    pub dirs: DirConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::for_mode(Mode::Development)
    }
}

impl EnvConfig {
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            mode,
            timestamp: !mode.is_production(),
            level: Level::Info,
            file: None,
            dirs: DirConfig::default(),
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mode_value = lookup(ENV_MODE).or_else(|| lookup(ENV_MODE_FALLBACK));
        let mut config = Self::for_mode(Mode::from_env_value(mode_value.as_deref()));

        if let Some(value) = lookup(ENV_TIMESTAMP) {
            match parse_bool(ENV_TIMESTAMP, &value) {
                Ok(timestamp) => config.timestamp = timestamp,
                Err(e) => tracing::warn!(error = %e, "Ignoring timestamp setting"),
            }
        }

        if let Some(value) = lookup(ENV_LEVEL) {
            match value.parse::<Level>() {
                Ok(level) => config.level = level,
                Err(e) => tracing::warn!(error = %e, "Ignoring level setting"),
            }
        }

        config.file = lookup(ENV_FILE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        config
    }

    /// Console output format for this configuration's mode.
    pub fn format(&self) -> LogFormat {
        if self.mode.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Project-level configuration loaded from `lil-logger.toml`
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub dev_dir: Option<String>,
    pub prod_dir: Option<String>,
    pub level: Option<String>,
    pub timestamp: Option<bool>,
    pub file: Option<PathBuf>,
}

impl FileConfig {
    /// Load configuration from a directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path.clone(),
            source,
        })?;

        tracing::debug!(path = %config_path.display(), "Loaded logger config file");
        Ok(Some(config))
    }

    /// Overlay the file's settings on top of `base`.
    pub fn apply(&self, mut base: EnvConfig) -> Result<EnvConfig, ConfigError> {
        if let Some(dev_dir) = &self.dev_dir {
            base.dirs.dev_dir = dev_dir.clone();
        }
        if let Some(prod_dir) = &self.prod_dir {
            base.dirs.prod_dir = prod_dir.clone();
        }
        if let Some(level) = &self.level {
            base.level = level.parse().map_err(|_| ConfigError::InvalidValue {
                key: "level".to_string(),
                value: level.clone(),
            })?;
        }
        if let Some(timestamp) = self.timestamp {
            base.timestamp = timestamp;
        }
        if let Some(file) = &self.file {
            base.file = Some(file.clone());
        }
        Ok(base)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_development() {
        let config = EnvConfig::from_lookup(lookup(&[]));
        assert_eq!(config.mode, Mode::Development);
        assert!(config.timestamp);
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.dirs, DirConfig::new("src", "dist"));
        assert_eq!(config.format(), LogFormat::Pretty);
    }

    #[test]
    fn test_production_disables_timestamp_by_default() {
        let config = EnvConfig::from_lookup(lookup(&[(ENV_MODE, "production")]));
        assert_eq!(config.mode, Mode::Production);
        assert!(!config.timestamp);
        assert_eq!(config.format(), LogFormat::Json);
    }

    #[test]
    fn test_timestamp_flag_overrides_mode_default() {
        let config = EnvConfig::from_lookup(lookup(&[
            (ENV_MODE, "Production"),
            (ENV_TIMESTAMP, "yes"),
        ]));
        assert!(config.timestamp);
    }

    #[test]
    fn test_fallback_mode_variable() {
        let config = EnvConfig::from_lookup(lookup(&[(ENV_MODE_FALLBACK, "production")]));
        assert_eq!(config.mode, Mode::Production);

        let config = EnvConfig::from_lookup(lookup(&[
            (ENV_MODE, "staging"),
            (ENV_MODE_FALLBACK, "production"),
        ]));
        assert_eq!(config.mode, Mode::Development);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = EnvConfig::from_lookup(lookup(&[
            (ENV_TIMESTAMP, "sometimes"),
            (ENV_LEVEL, "verbose"),
            (ENV_FILE, "  "),
        ]));
        assert!(config.timestamp);
        assert_eq!(config.level, Level::Info);
        assert_eq!(config.file, None);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        std::env::set_var(ENV_MODE, "production");
        std::env::set_var(ENV_LEVEL, "debug");
        let config = EnvConfig::from_env();
        std::env::remove_var(ENV_MODE);
        std::env::remove_var(ENV_LEVEL);

        assert_eq!(config.mode, Mode::Production);
        assert_eq!(config.level, Level::Debug);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(FileConfig::load(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_load_and_apply() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "dev_dir = \"lib\"\nprod_dir = \"build\"\nlevel = \"debug\"\ntimestamp = false\n",
        )
        .unwrap();

        let file_config = FileConfig::load(dir.path()).unwrap().unwrap();
        let config = file_config.apply(EnvConfig::default()).unwrap();

        assert_eq!(config.dirs, DirConfig::new("lib", "build"));
        assert_eq!(config.level, Level::Debug);
        assert!(!config.timestamp);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "colour = true\n").unwrap();

        let err = FileConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_apply_rejects_bad_level() {
        let file_config = FileConfig {
            level: Some("loud".to_string()),
            ..Default::default()
        };
        let err = file_config.apply(EnvConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for level: loud");
    }
}
