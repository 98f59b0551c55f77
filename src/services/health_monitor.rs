//! Health monitor service.
//!
//! Polls a project at a fixed interval. Each check runs every registered
//! probe concurrently, folds the discovered issues into one `HealthReport`,
//! and appends it to a capped per-project history. Issues are fingerprinted
//! so a problem seen again bumps the retained issue's occurrence count.
//! Any issue at or above the emergency severity is broadcast immediately to
//! subscribers (the recovery loop), independent of the sweep cadence.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::domain::models::{HealthIssue, HealthReport, HealthStatus, IssueType, MonitorConfig};
use crate::domain::ports::HealthProbe;

/// Severity at which an issue counts as critical for scoring and status.
pub const CRITICAL_SEVERITY: u8 = 8;

/// Emergency notification for critical issues found by a check.
#[derive(Debug, Clone)]
pub struct EmergencySignal {
    pub project_id: String,
    pub issues: Vec<HealthIssue>,
}

/// Compute the health score for a set of issues.
///
/// `1 - Σseverity / (N × 10)`, discounted by 10% per critical issue and
/// clamped to `[0, 1]`. An empty set scores 1.0.
pub fn health_score(issues: &[HealthIssue]) -> f64 {
    if issues.is_empty() {
        return 1.0;
    }
    let total: f64 = issues.iter().map(|i| f64::from(i.severity)).sum();
    let base = 1.0 - total / (issues.len() as f64 * 10.0);
    let critical = issues
        .iter()
        .filter(|i| i.severity >= CRITICAL_SEVERITY)
        .count();
    let discount = 0.9_f64.powi(i32::try_from(critical).unwrap_or(i32::MAX));
    (base * discount).clamp(0.0, 1.0)
}

/// Bucket a score into a status. Any critical issue wins regardless of score.
pub fn classify(score: f64, issues: &[HealthIssue]) -> HealthStatus {
    if issues.iter().any(|i| i.severity >= CRITICAL_SEVERITY) {
        HealthStatus::Critical
    } else if score < 0.3 {
        HealthStatus::Failing
    } else if score < 0.6 {
        HealthStatus::Warning
    } else if score < 0.8 {
        HealthStatus::Good
    } else {
        HealthStatus::Excellent
    }
}

fn recommendation_for(issue_type: IssueType) -> &'static str {
    match issue_type {
        IssueType::Syntax => "Fix syntax errors before the next build",
        IssueType::Runtime => "Add guards around the failing code path and check recent deploys",
        IssueType::Logic => "Add regression tests covering the incorrect behaviour",
        IssueType::Performance => "Profile hot paths and review resource limits",
        IssueType::Security => "Patch vulnerable components and rotate exposed credentials",
        IssueType::Dependency => "Reinstall or pin the affected dependencies",
        IssueType::Config => "Restore known-good configuration values",
        IssueType::Api => "Check upstream API availability and contract changes",
        IssueType::Database => "Verify database connectivity and pending migrations",
        IssueType::Integration => "Re-verify credentials and endpoints of integrated services",
        IssueType::System => "Check host resources (disk, memory, file handles)",
        IssueType::Orchestration => "Inspect failed work items and their handlers",
    }
}

fn recommendations(status: HealthStatus, issues: &[HealthIssue]) -> Vec<String> {
    let mut recs: Vec<String> = Vec::new();
    if status == HealthStatus::Critical {
        recs.push("Critical issues present: automated recovery has been requested".to_string());
    }
    for issue in issues {
        let rec = recommendation_for(issue.issue_type).to_string();
        if !recs.contains(&rec) {
            recs.push(rec);
        }
    }
    recs
}

/// Per-project rolling state.
#[derive(Debug, Default)]
struct ProjectHealth {
    reports: VecDeque<HealthReport>,
    issues: HashMap<String, HealthIssue>,
    issue_order: VecDeque<String>,
}

impl ProjectHealth {
    /// Merge freshly probed issues into the retained history, returning the
    /// retained (possibly repeat-counted) copies in probe order.
    fn absorb(&mut self, found: Vec<HealthIssue>, limit: usize) -> Vec<HealthIssue> {
        let now = Utc::now();
        let mut merged: Vec<HealthIssue> = Vec::with_capacity(found.len());
        for issue in found {
            let key = issue.fingerprint();
            let retained = if let Some(existing) = self.issues.get_mut(&key) {
                existing.record_occurrence(now);
                // Recurring issues are the freshest, not the oldest.
                if let Some(pos) = self.issue_order.iter().position(|k| *k == key) {
                    self.issue_order.remove(pos);
                }
                self.issue_order.push_back(key.clone());
                existing.clone()
            } else {
                self.issue_order.push_back(key.clone());
                self.issues.insert(key.clone(), issue.clone());
                while self.issue_order.len() > limit {
                    if let Some(oldest) = self.issue_order.pop_front() {
                        self.issues.remove(&oldest);
                    }
                }
                issue
            };

            if let Some(pos) = merged.iter().position(|i| i.fingerprint() == key) {
                merged[pos] = retained;
            } else {
                merged.push(retained);
            }
        }
        merged
    }
}

struct MonitorHandle {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Health monitor for projects.
#[derive(Clone)]
pub struct HealthMonitor {
    probes: Arc<Vec<Arc<dyn HealthProbe>>>,
    config: MonitorConfig,
    state: Arc<RwLock<HashMap<String, ProjectHealth>>>,
    monitors: Arc<Mutex<HashMap<String, MonitorHandle>>>,
    emergency_tx: broadcast::Sender<EmergencySignal>,
}

impl HealthMonitor {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>, config: MonitorConfig) -> Self {
        let (emergency_tx, _) = broadcast::channel(64);
        Self {
            probes: Arc::new(probes),
            config,
            state: Arc::new(RwLock::new(HashMap::new())),
            monitors: Arc::new(Mutex::new(HashMap::new())),
            emergency_tx,
        }
    }

    /// Configured interval between checks.
    pub fn default_interval(&self) -> Duration {
        Duration::from_secs(self.config.interval_secs)
    }

    pub fn emergency_severity(&self) -> u8 {
        self.config.emergency_severity
    }

    /// Receive emergency signals from every monitored project.
    pub fn subscribe_emergencies(&self) -> broadcast::Receiver<EmergencySignal> {
        self.emergency_tx.subscribe()
    }

    /// Start the recurring check for `project_id`.
    ///
    /// Returns `false` (and logs a warning) when the project is already
    /// monitored or `interval` is zero. The first check runs immediately.
    pub async fn start(&self, project_id: &str, interval: Duration) -> bool {
        if interval.is_zero() {
            tracing::warn!(project_id, "refusing to monitor with a zero interval");
            return false;
        }
        let mut monitors = self.monitors.lock().await;
        if let Some(existing) = monitors.get(project_id) {
            if !existing.handle.is_finished() {
                tracing::warn!(project_id, "project is already being monitored");
                return false;
            }
        }

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let monitor = self.clone();
        let project = project_id.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            tracing::info!(
                project_id = %project,
                interval_secs = interval.as_secs(),
                "Started health monitoring"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = monitor.check_now(&project).await;
                        tracing::debug!(
                            project_id = %project,
                            score = report.score,
                            status = %report.status,
                            issues = report.issues.len(),
                            "health check completed"
                        );
                    }

                    _ = shutdown_rx.recv() => {
                        tracing::info!(
                            project_id = %project,
                            "Received shutdown signal, stopping health monitoring"
                        );
                        break;
                    }
                }
            }
        });

        monitors.insert(
            project_id.to_string(),
            MonitorHandle {
                shutdown_tx,
                handle,
            },
        );
        true
    }

    /// Stop the recurring check. Returns `false` if the project was not monitored.
    pub async fn stop(&self, project_id: &str) -> bool {
        let Some(monitor) = self.monitors.lock().await.remove(project_id) else {
            return false;
        };
        if monitor.shutdown_tx.send(()).is_err() {
            monitor.handle.abort();
        }
        tracing::info!(project_id, "health monitoring stopped");
        true
    }

    /// Stop every recurring check.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, MonitorHandle)> = self.monitors.lock().await.drain().collect();
        for (project_id, monitor) in drained {
            if monitor.shutdown_tx.send(()).is_err() {
                monitor.handle.abort();
            }
            tracing::info!(project_id = %project_id, "health monitoring stopped");
        }
    }

    pub async fn is_monitoring(&self, project_id: &str) -> bool {
        self.monitors
            .lock()
            .await
            .get(project_id)
            .is_some_and(|m| !m.handle.is_finished())
    }

    pub async fn monitored_projects(&self) -> Vec<String> {
        let mut projects: Vec<String> = self
            .monitors
            .lock()
            .await
            .iter()
            .filter(|(_, m)| !m.handle.is_finished())
            .map(|(p, _)| p.clone())
            .collect();
        projects.sort();
        projects
    }

    /// Run one assessment immediately and record it.
    pub async fn check_now(&self, project_id: &str) -> HealthReport {
        let probes = futures::future::join_all(self.probes.iter().map(|probe| async move {
            (probe.name().to_string(), probe.probe(project_id).await)
        }))
        .await;

        let mut found = Vec::new();
        let mut probe_errors = Vec::new();
        for (name, result) in probes {
            match result {
                Ok(issues) => found.extend(issues),
                Err(e) => {
                    tracing::warn!(project_id, probe = %name, error = %e, "health probe failed");
                    probe_errors.push(format!("{name}: {e}"));
                }
            }
        }

        let report = {
            let mut state = self.state.write().await;
            let project = state.entry(project_id.to_string()).or_default();
            let issues = project.absorb(found, self.config.issue_history_limit.max(1));
            let score = health_score(&issues);
            let status = classify(score, &issues);
            let report = HealthReport {
                project_id: project_id.to_string(),
                timestamp: Utc::now(),
                status,
                score,
                recommendations: recommendations(status, &issues),
                issues,
                probe_errors,
            };

            project.reports.push_back(report.clone());
            while project.reports.len() > self.config.history_limit.max(1) {
                project.reports.pop_front();
            }
            report
        };

        let emergencies: Vec<HealthIssue> = report
            .critical_issues(self.config.emergency_severity)
            .cloned()
            .collect();
        if !emergencies.is_empty() {
            tracing::warn!(
                project_id,
                critical = emergencies.len(),
                "critical issues detected, signalling recovery loop"
            );
            let _ = self.emergency_tx.send(EmergencySignal {
                project_id: project_id.to_string(),
                issues: emergencies,
            });
        }

        report
    }

    pub async fn latest_report(&self, project_id: &str) -> Option<HealthReport> {
        self.state
            .read()
            .await
            .get(project_id)
            .and_then(|p| p.reports.back().cloned())
    }

    /// Reports for a project, oldest first.
    pub async fn history(&self, project_id: &str) -> Vec<HealthReport> {
        self.state
            .read()
            .await
            .get(project_id)
            .map(|p| p.reports.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Retained distinct issues for a project, oldest first.
    pub async fn issue_history(&self, project_id: &str) -> Vec<HealthIssue> {
        self.state
            .read()
            .await
            .get(project_id)
            .map(|p| {
                p.issue_order
                    .iter()
                    .filter_map(|key| p.issues.get(key).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::probes::StaticProbe;
    use crate::domain::errors::{DomainError, DomainResult};
    use async_trait::async_trait;

    fn issue(sev: u8) -> HealthIssue {
        HealthIssue::new(IssueType::Runtime, sev, format!("sev {sev}"), "svc")
    }

    struct BrokenProbe;

    #[async_trait]
    impl HealthProbe for BrokenProbe {
        fn name(&self) -> &str {
            "broken"
        }

        async fn probe(&self, _project_id: &str) -> DomainResult<Vec<HealthIssue>> {
            Err(DomainError::collaborator("broken", "probe crashed"))
        }
    }

    fn monitor(issues: Vec<HealthIssue>, config: MonitorConfig) -> HealthMonitor {
        HealthMonitor::new(
            vec![Arc::new(StaticProbe::new("static", issues)), Arc::new(BrokenProbe)],
            config,
        )
    }

    #[test]
    fn test_score_without_issues() {
        assert!((health_score(&[]) - 1.0).abs() < f64::EPSILON);
        assert_eq!(classify(1.0, &[]), HealthStatus::Excellent);
    }

    #[test]
    fn test_score_formula() {
        // base = 1 - 6/20 = 0.7, no critical issues
        let issues = vec![issue(2), issue(4)];
        assert!((health_score(&issues) - 0.7).abs() < 1e-9);
        assert_eq!(classify(health_score(&issues), &issues), HealthStatus::Good);

        // base = 1 - 9/10 = 0.1, one critical issue => 0.09
        let critical = vec![issue(9)];
        assert!((health_score(&critical) - 0.09).abs() < 1e-9);
        assert_eq!(classify(health_score(&critical), &critical), HealthStatus::Critical);
    }

    #[test]
    fn test_status_buckets() {
        let mild = vec![issue(1)];
        assert_eq!(classify(0.25, &mild), HealthStatus::Failing);
        assert_eq!(classify(0.5, &mild), HealthStatus::Warning);
        assert_eq!(classify(0.7, &mild), HealthStatus::Good);
        assert_eq!(classify(0.95, &mild), HealthStatus::Excellent);
        assert_eq!(classify(0.95, &[issue(8)]), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_check_now_records_report_and_probe_errors() {
        let monitor = monitor(vec![issue(3)], MonitorConfig::default());
        let report = monitor.check_now("p").await;

        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.probe_errors.len(), 1);
        assert!(report.probe_errors[0].starts_with("broken"));
        assert!(!report.recommendations.is_empty());
        assert_eq!(monitor.latest_report("p").await.unwrap().timestamp, report.timestamp);
    }

    #[tokio::test]
    async fn test_repeat_detection_bumps_occurrence_count() {
        let monitor = monitor(vec![issue(3)], MonitorConfig::default());
        let first = monitor.check_now("p").await;
        let second = monitor.check_now("p").await;
        let third = monitor.check_now("p").await;

        assert_eq!(first.issues[0].id, third.issues[0].id);
        assert_eq!(second.issues[0].occurrence_count, 2);
        assert_eq!(third.issues[0].occurrence_count, 3);
        assert_eq!(monitor.issue_history("p").await.len(), 1);
    }

    #[test]
    fn test_recurring_issue_survives_history_eviction() {
        let mut health = ProjectHealth::default();
        let recurring = issue(3);
        health.absorb(vec![recurring.clone()], 2);
        health.absorb(vec![issue(4)], 2);
        health.absorb(vec![recurring.clone()], 2);
        // evicts the stale issue, not the one that just recurred
        health.absorb(vec![issue(5)], 2);

        let merged = health.absorb(vec![recurring.clone()], 2);
        assert_eq!(merged[0].occurrence_count, 3);
        assert!(!health.issues.contains_key(&issue(4).fingerprint()));
        assert_eq!(health.issue_order.len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let config = MonitorConfig {
            history_limit: 3,
            ..MonitorConfig::default()
        };
        let monitor = monitor(vec![], config);
        for _ in 0..5 {
            monitor.check_now("p").await;
        }
        assert_eq!(monitor.history("p").await.len(), 3);
        assert!(monitor.history("other").await.is_empty());
    }

    #[tokio::test]
    async fn test_critical_issue_emits_emergency() {
        let monitor = monitor(vec![issue(9), issue(2)], MonitorConfig::default());
        let mut rx = monitor.subscribe_emergencies();
        monitor.check_now("p").await;

        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.project_id, "p");
        assert_eq!(signal.issues.len(), 1);
        assert_eq!(signal.issues[0].severity, 9);
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let monitor = monitor(vec![], MonitorConfig::default());
        assert!(!monitor.start("p", Duration::ZERO).await);
        assert!(!monitor.is_monitoring("p").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_and_stop_cancels() {
        let monitor = monitor(vec![issue(2)], MonitorConfig::default());

        assert!(monitor.start("p", Duration::from_secs(10)).await);
        assert!(!monitor.start("p", Duration::from_secs(10)).await);
        assert!(monitor.is_monitoring("p").await);

        tokio::time::sleep(Duration::from_secs(25)).await;
        let checks = monitor.history("p").await.len();
        assert!(checks >= 3, "expected at least 3 checks, got {checks}");

        assert!(monitor.stop("p").await);
        assert!(!monitor.is_monitoring("p").await);
        assert!(!monitor.stop("p").await);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(monitor.history("p").await.len(), checks);
    }
}
