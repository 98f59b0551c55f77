use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::IssueType;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_concurrent_sessions: {0}. Must be at least 1")]
    InvalidMaxSessions(usize),

    #[error("Invalid auto_apply_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    #[error("Invalid {field}: must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("Invalid {field}: {value}. Must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .medic/config.yaml
    /// 3. .medic/local.yaml (optional local overrides)
    /// 4. Environment variables (MEDIC_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from(".")
    }

    /// Same as [`ConfigLoader::load`] with `.medic/` resolved under `root`.
    pub fn load_from(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(".medic");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("MEDIC_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let recovery = &config.recovery;
        if recovery.max_concurrent_sessions == 0 {
            return Err(ConfigError::InvalidMaxSessions(recovery.max_concurrent_sessions));
        }
        if !(0.0..=1.0).contains(&recovery.auto_apply_threshold) {
            return Err(ConfigError::InvalidThreshold(recovery.auto_apply_threshold));
        }
        non_zero("recovery.session_timeout_secs", recovery.session_timeout_secs)?;
        non_zero("recovery.sweep_interval_secs", recovery.sweep_interval_secs)?;
        non_zero("recovery.archive_limit", recovery.archive_limit as u64)?;

        let monitor = &config.monitor;
        non_zero("monitor.interval_secs", monitor.interval_secs)?;
        non_zero("monitor.history_limit", monitor.history_limit as u64)?;
        non_zero("monitor.issue_history_limit", monitor.issue_history_limit as u64)?;
        in_range("monitor.emergency_severity", monitor.emergency_severity.into(), 1, 10)?;

        for probe in &monitor.probes {
            if probe.name.is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "probe name cannot be empty".to_string(),
                ));
            }
            if probe.command.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "probe '{}' command cannot be empty",
                    probe.name
                )));
            }
            if IssueType::from_str(&probe.issue_type).is_none() {
                return Err(ConfigError::ValidationFailed(format!(
                    "probe '{}' has unknown issue type '{}'",
                    probe.name, probe.issue_type
                )));
            }
            in_range("probe severity", probe.severity.into(), 1, 10)?;
            non_zero("probe timeout_secs", probe.timeout_secs)?;
        }

        let scheduler = &config.scheduler;
        in_range("scheduler.critical_priority", scheduler.critical_priority.into(), 0, 10)?;
        if let Some(ceiling) = scheduler.max_concurrency {
            non_zero("scheduler.max_concurrency", ceiling as u64)?;
        }
        if let Some(secs) = scheduler.item_timeout_secs {
            non_zero("scheduler.item_timeout_secs", secs)?;
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

fn non_zero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroValue { field });
    }
    Ok(())
}

fn in_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::CommandProbeConfig;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recovery.max_concurrent_sessions, 3);
        assert!((config.recovery.auto_apply_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
scheduler:
  max_concurrency: 2
  strict_cycles: true
monitor:
  interval_secs: 15
  probes:
    - name: tests
      command: cargo test --quiet
      issue_type: logic
recovery:
  auto_apply_threshold: 0.9
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.scheduler.max_concurrency, Some(2));
        assert!(config.scheduler.strict_cycles);
        assert_eq!(config.monitor.interval_secs, 15);
        assert_eq!(config.monitor.probes[0].severity, 5);
        assert!((config.recovery.auto_apply_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.recovery.session_timeout_secs, 300);
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_sessions() {
        let mut config = Config::default();
        config.recovery.max_concurrent_sessions = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxSessions(0)
        ));
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = Config::default();
        config.recovery.auto_apply_threshold = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidThreshold(_)
        ));
    }

    #[test]
    fn test_validate_zero_values() {
        let mut config = Config::default();
        config.recovery.session_timeout_secs = 0;
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ZeroValue { field } => assert_eq!(field, "recovery.session_timeout_secs"),
            other => panic!("Expected ZeroValue error, got {other}"),
        }

        let mut config = Config::default();
        config.monitor.interval_secs = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroValue { .. }
        ));
    }

    #[test]
    fn test_validate_severity_range() {
        let mut config = Config::default();
        config.monitor.emergency_severity = 11;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::OutOfRange { value: 11, .. }
        ));
    }

    #[test]
    fn test_validate_probe() {
        let mut config = Config::default();
        config.monitor.probes.push(CommandProbeConfig {
            name: "lint".into(),
            command: "true".into(),
            issue_type: "weather".into(),
            severity: 5,
            timeout_secs: 10,
        });
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("weather")),
            other => panic!("Expected ValidationFailed error, got {other}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            _ => panic!("Expected InvalidLogLevel error"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            _ => panic!("Expected InvalidLogFormat error"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "recovery:\n  max_concurrent_sessions: 7").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.recovery.max_concurrent_sessions, 7);
        assert_eq!(config.recovery.archive_limit, 100);
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "recovery:\n  auto_apply_threshold: 2.0").unwrap();
        file.flush().unwrap();
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_hierarchical_merging_with_env() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(".medic");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "recovery:\n  max_concurrent_sessions: 5\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        std::fs::write(dir.join("local.yaml"), "logging:\n  level: debug\n").unwrap();

        temp_env::with_vars(
            [("MEDIC_RECOVERY__SESSION_TIMEOUT_SECS", Some("42"))],
            || {
                let config = ConfigLoader::load_from(root.path()).unwrap();
                assert_eq!(config.recovery.max_concurrent_sessions, 5);
                assert_eq!(config.logging.level, "debug", "local.yaml should win");
                assert_eq!(config.logging.format, "json", "base value should persist");
                assert_eq!(config.recovery.session_timeout_secs, 42, "env should win");
            },
        );
    }
}
