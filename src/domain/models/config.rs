use serde::{Deserialize, Serialize};

/// Main configuration structure for medic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Phase executor configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Health monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Recovery loop configuration
    #[serde(default)]
    pub recovery: RecoveryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Phase executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Ceiling on concurrent items per phase. `None` uses the number of
    /// registered capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Items at or above this priority are critical (0-10)
    #[serde(default = "default_critical_priority")]
    pub critical_priority: u8,

    /// Per-item timeout in seconds (disabled when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_timeout_secs: Option<u64>,

    /// Cancel items whose dependencies failed instead of running them
    #[serde(default)]
    pub skip_dependents_on_failure: bool,

    /// Reject cyclic workflows instead of using the trailing fallback phase
    #[serde(default)]
    pub strict_cycles: bool,
}

const fn default_critical_priority() -> u8 {
    8
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            critical_priority: default_critical_priority(),
            item_timeout_secs: None,
            skip_dependents_on_failure: false,
            strict_cycles: false,
        }
    }
}

/// Health monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Seconds between health checks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Reports retained per project
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Distinct issues retained per project
    #[serde(default = "default_issue_history_limit")]
    pub issue_history_limit: usize,

    /// Issues at or above this severity signal the recovery loop immediately
    #[serde(default = "default_emergency_severity")]
    pub emergency_severity: u8,

    /// Shell probes run on every check
    #[serde(default)]
    pub probes: Vec<CommandProbeConfig>,
}

const fn default_interval_secs() -> u64 {
    60
}

const fn default_history_limit() -> usize {
    100
}

const fn default_issue_history_limit() -> usize {
    500
}

const fn default_emergency_severity() -> u8 {
    8
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            history_limit: default_history_limit(),
            issue_history_limit: default_issue_history_limit(),
            emergency_severity: default_emergency_severity(),
            probes: vec![],
        }
    }
}

/// A shell command run as a health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandProbeConfig {
    /// Probe name, used as the issue location
    pub name: String,

    /// Command line passed to `sh -c`
    pub command: String,

    /// Issue type reported on failure
    #[serde(default = "default_probe_issue_type")]
    pub issue_type: String,

    /// Severity reported on failure (1-10)
    #[serde(default = "default_probe_severity")]
    pub severity: u8,

    /// Seconds before the command is killed
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_probe_issue_type() -> String {
    "runtime".to_string()
}

const fn default_probe_severity() -> u8 {
    5
}

const fn default_probe_timeout_secs() -> u64 {
    30
}

/// Recovery loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RecoveryConfig {
    /// Maximum concurrently active recovery sessions
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: usize,

    /// Allow solutions to be applied without human approval
    #[serde(default = "default_true")]
    pub auto_apply_enabled: bool,

    /// Minimum solution confidence for auto-apply (0.0-1.0)
    #[serde(default = "default_auto_apply_threshold")]
    pub auto_apply_threshold: f64,

    /// Wall-clock budget per session in seconds
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Seconds between orchestrator sweeps
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Issues seen more often than this are recovered even when not critical
    #[serde(default = "default_repetition_threshold")]
    pub repetition_threshold: u32,

    /// Finished sessions retained in the archive
    #[serde(default = "default_archive_limit")]
    pub archive_limit: usize,
}

const fn default_max_concurrent_sessions() -> usize {
    3
}

const fn default_true() -> bool {
    true
}

const fn default_auto_apply_threshold() -> f64 {
    0.8
}

const fn default_session_timeout_secs() -> u64 {
    300
}

const fn default_sweep_interval_secs() -> u64 {
    30
}

const fn default_repetition_threshold() -> u32 {
    3
}

const fn default_archive_limit() -> usize {
    100
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
            auto_apply_enabled: default_true(),
            auto_apply_threshold: default_auto_apply_threshold(),
            session_timeout_secs: default_session_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            repetition_threshold: default_repetition_threshold(),
            archive_limit: default_archive_limit(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files (stdout only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scheduler.max_concurrency, None);
        assert_eq!(config.scheduler.critical_priority, 8);
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.history_limit, 100);
        assert_eq!(config.recovery.max_concurrent_sessions, 3);
        assert!(config.recovery.auto_apply_enabled);
        assert!((config.recovery.auto_apply_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.recovery.session_timeout_secs, 300);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
recovery:
  max_concurrent_sessions: 5
monitor:
  probes:
    - name: unit-tests
      command: cargo test --quiet
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.recovery.max_concurrent_sessions, 5);
        assert_eq!(config.recovery.archive_limit, 100);
        assert_eq!(config.monitor.probes.len(), 1);
        assert_eq!(config.monitor.probes[0].issue_type, "runtime");
        assert_eq!(config.monitor.probes[0].timeout_secs, 30);
    }
}
