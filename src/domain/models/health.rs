//! Health issues and reports produced by the health monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Category of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Syntax,
    Runtime,
    Logic,
    Performance,
    Security,
    Dependency,
    Config,
    Api,
    Database,
    Integration,
    System,
    Orchestration,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Runtime => "runtime",
            Self::Logic => "logic",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Dependency => "dependency",
            Self::Config => "config",
            Self::Api => "api",
            Self::Database => "database",
            Self::Integration => "integration",
            Self::System => "system",
            Self::Orchestration => "orchestration",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "syntax" => Some(Self::Syntax),
            "runtime" => Some(Self::Runtime),
            "logic" => Some(Self::Logic),
            "performance" => Some(Self::Performance),
            "security" => Some(Self::Security),
            "dependency" => Some(Self::Dependency),
            "config" | "configuration" => Some(Self::Config),
            "api" => Some(Self::Api),
            "database" => Some(Self::Database),
            "integration" => Some(Self::Integration),
            "system" => Some(Self::System),
            "orchestration" => Some(Self::Orchestration),
            _ => None,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem detected in a project.
///
/// Issues are immutable once created apart from the repeat counters
/// (`occurrence_count`, `last_seen`), which the monitor bumps when the same
/// problem is seen again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub id: Uuid,
    pub issue_type: IssueType,
    /// Severity from 1 (cosmetic) to 10 (outage).
    pub severity: u8,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub error_text: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u32,
}

impl HealthIssue {
    /// Create an issue seen once, now. Severity is clamped into `1..=10`.
    pub fn new(
        issue_type: IssueType,
        severity: u8,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            issue_type,
            severity: severity.clamp(1, 10),
            description: description.into(),
            location: location.into(),
            error_text: None,
            stack_trace: None,
            first_seen: now,
            last_seen: now,
            occurrence_count: 1,
        }
    }

    pub fn with_error_text(mut self, text: impl Into<String>) -> Self {
        self.error_text = Some(text.into());
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Key used to recognise the same problem across checks.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}",
            self.issue_type.as_str(),
            self.location,
            self.description
        )
    }

    pub fn is_critical(&self, threshold: u8) -> bool {
        self.severity >= threshold
    }

    /// Record another sighting of this issue.
    pub fn record_occurrence(&mut self, seen_at: DateTime<Utc>) {
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        if seen_at > self.last_seen {
            self.last_seen = seen_at;
        }
    }
}

/// Overall status derived from a report's score and issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Failing,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Failing => "failing",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a project's health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: HealthStatus,
    /// Score in `[0.0, 1.0]`, higher is healthier.
    pub score: f64,
    pub issues: Vec<HealthIssue>,
    pub recommendations: Vec<String>,
    /// Probes that failed to run during this check.
    #[serde(default)]
    pub probe_errors: Vec<String>,
}

impl HealthReport {
    pub fn critical_issues(&self, threshold: u8) -> impl Iterator<Item = &HealthIssue> {
        self.issues.iter().filter(move |i| i.is_critical(threshold))
    }

    pub fn has_critical(&self, threshold: u8) -> bool {
        self.critical_issues(threshold).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_is_clamped() {
        assert_eq!(HealthIssue::new(IssueType::Runtime, 0, "d", "l").severity, 1);
        assert_eq!(HealthIssue::new(IssueType::Runtime, 99, "d", "l").severity, 10);
    }

    #[test]
    fn test_fingerprint_ignores_id_and_severity() {
        let a = HealthIssue::new(IssueType::Config, 3, "missing key", "app.yaml");
        let b = HealthIssue::new(IssueType::Config, 7, "missing key", "app.yaml");
        assert_ne!(a.id, b.id);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = HealthIssue::new(IssueType::Runtime, 3, "missing key", "app.yaml");
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_record_occurrence() {
        let mut issue = HealthIssue::new(IssueType::Api, 5, "502 from upstream", "gateway");
        let later = issue.last_seen + chrono::Duration::seconds(30);
        issue.record_occurrence(later);
        assert_eq!(issue.occurrence_count, 2);
        assert_eq!(issue.last_seen, later);
        assert!(issue.first_seen < issue.last_seen);
    }

    #[test]
    fn test_issue_type_round_trip_names() {
        assert_eq!(IssueType::from_str("configuration"), Some(IssueType::Config));
        assert_eq!(IssueType::from_str("ORCHESTRATION"), Some(IssueType::Orchestration));
        assert_eq!(IssueType::from_str("weather"), None);
        assert_eq!(
            serde_json::to_string(&IssueType::Dependency).unwrap(),
            "\"dependency\""
        );
    }
}
