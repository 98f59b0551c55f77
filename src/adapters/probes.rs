//! Health probes.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CommandProbeConfig, HealthIssue, IssueType};
use crate::domain::ports::HealthProbe;

/// Probe that reports the same issues on every check.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    issues: Vec<HealthIssue>,
}

impl StaticProbe {
    pub fn new(name: impl Into<String>, issues: Vec<HealthIssue>) -> Self {
        Self {
            name: name.into(),
            issues,
        }
    }

    /// A probe that never finds anything.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }
}

#[async_trait]
impl HealthProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, _project_id: &str) -> DomainResult<Vec<HealthIssue>> {
        Ok(self.issues.clone())
    }
}

/// Probe that runs a shell command and reports a non-zero exit as an issue.
///
/// The project id is exported to the command as `MEDIC_PROJECT`.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    name: String,
    command: String,
    issue_type: IssueType,
    severity: u8,
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            issue_type: IssueType::Runtime,
            severity: 5,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_issue(mut self, issue_type: IssueType, severity: u8) -> Self {
        self.issue_type = issue_type;
        self.severity = severity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &CommandProbeConfig) -> DomainResult<Self> {
        let issue_type = IssueType::from_str(&config.issue_type).ok_or_else(|| {
            DomainError::ValidationFailed(format!(
                "probe '{}' has unknown issue type '{}'",
                config.name, config.issue_type
            ))
        })?;
        Ok(Self::new(&config.name, &config.command)
            .with_issue(issue_type, config.severity)
            .with_timeout(Duration::from_secs(config.timeout_secs)))
    }

    fn issue(&self, description: String, error_text: String) -> HealthIssue {
        HealthIssue::new(self.issue_type, self.severity, description, &self.name)
            .with_error_text(error_text)
    }
}

#[async_trait]
impl HealthProbe for CommandProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self, project_id: &str) -> DomainResult<Vec<HealthIssue>> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("MEDIC_PROJECT", project_id)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DomainError::collaborator(self.name.clone(), format!("failed to spawn: {e}"))
            })?;

        let Ok(output) = tokio::time::timeout(self.timeout, child.wait_with_output()).await else {
            tracing::warn!(
                probe = %self.name,
                timeout_secs = self.timeout.as_secs(),
                "probe command timed out"
            );
            return Ok(vec![self.issue(
                format!("probe '{}' timed out", self.name),
                format!(
                    "command did not finish within {}s: {}",
                    self.timeout.as_secs(),
                    self.command
                ),
            )]);
        };
        let output =
            output.map_err(|e| DomainError::collaborator(self.name.clone(), e.to_string()))?;

        if output.status.success() {
            return Ok(Vec::new());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let text = if stderr.is_empty() { stdout } else { stderr };
        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let summary = text
            .lines()
            .next()
            .map_or_else(|| format!("probe '{}' exited with {code}", self.name), str::to_string);

        tracing::debug!(probe = %self.name, %code, "probe command failed");
        Ok(vec![self.issue(summary, text)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_probe_returns_issues() {
        let issue = HealthIssue::new(IssueType::Api, 4, "slow endpoint", "api");
        let probe = StaticProbe::new("fixed", vec![issue.clone()]);
        assert_eq!(probe.probe("p").await.unwrap(), vec![issue]);
        assert!(StaticProbe::healthy("ok").probe("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_command_probe_success_is_healthy() {
        let probe = CommandProbe::new("true", "exit 0");
        assert!(probe.probe("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_command_probe_failure_captures_stderr() {
        let probe = CommandProbe::new("lint", "echo 'missing semicolon' >&2; exit 2")
            .with_issue(IssueType::Syntax, 6);
        let issues = probe.probe("p").await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Syntax);
        assert_eq!(issues[0].severity, 6);
        assert_eq!(issues[0].description, "missing semicolon");
        assert_eq!(issues[0].location, "lint");
    }

    #[tokio::test]
    async fn test_command_probe_sees_project() {
        let probe = CommandProbe::new("env", "test \"$MEDIC_PROJECT\" = shop");
        assert!(probe.probe("shop").await.unwrap().is_empty());
        assert_eq!(probe.probe("other").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_command_probe_timeout() {
        let probe = CommandProbe::new("hang", "sleep 5").with_timeout(Duration::from_millis(50));
        let issues = probe.probe("p").await.unwrap();
        assert!(issues[0].description.contains("timed out"));
    }

    #[test]
    fn test_from_config_rejects_unknown_type() {
        let config = CommandProbeConfig {
            name: "x".into(),
            command: "true".into(),
            issue_type: "weather".into(),
            severity: 5,
            timeout_secs: 1,
        };
        assert!(CommandProbe::from_config(&config).is_err());
    }
}
