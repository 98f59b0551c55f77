//! Recovery loop orchestrator.
//!
//! Owns the bounded set of active recovery sessions, a capped archive of
//! finished ones, and the learning statistics computed from that archive.
//! Sessions are started by `trigger` (directly, from executor failures, from
//! emergency signals, or from the periodic sweep). The sweep also forces
//! sessions past their time budget into `failed("timeout")` and archives
//! every terminal session.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::models::{
    FailureReason, HealthIssue, IssueType, RecoveryConfig, RecoveryPhase, RecoverySession,
    TriggerOutcome,
};
use crate::services::health_monitor::HealthMonitor;
use crate::services::learning::LearningStats;
use crate::services::recovery_session::{SessionRunner, SharedSession};

/// Severity given to failures reported through `report_failure`.
pub const REPORTED_FAILURE_SEVERITY: u8 = 7;

struct ActiveSession {
    session: SharedSession,
    issue_id: Uuid,
    project_id: String,
    started: Instant,
    handle: JoinHandle<()>,
}

struct LoopHandle {
    shutdown_tx: broadcast::Sender<()>,
    sweep: JoinHandle<()>,
    listener: JoinHandle<()>,
}

/// Snapshot of one active session.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSessionInfo {
    pub session_id: Uuid,
    pub project_id: String,
    pub issue_type: IssueType,
    pub severity: u8,
    pub phase: RecoveryPhase,
    pub elapsed_secs: u64,
}

/// Snapshot of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryStatus {
    pub max_concurrent_sessions: usize,
    pub active_sessions: Vec<ActiveSessionInfo>,
    pub archived_sessions: usize,
    pub monitored_projects: Vec<String>,
    pub stats: LearningStats,
}

/// Orchestrates recovery sessions for any number of projects.
#[derive(Clone)]
pub struct RecoveryLoop {
    runner: SessionRunner,
    monitor: HealthMonitor,
    config: RecoveryConfig,
    active: Arc<Mutex<HashMap<Uuid, ActiveSession>>>,
    archive: Arc<Mutex<VecDeque<RecoverySession>>>,
    stats: Arc<RwLock<LearningStats>>,
    loops: Arc<Mutex<HashMap<String, LoopHandle>>>,
}

impl RecoveryLoop {
    pub fn new(runner: SessionRunner, monitor: HealthMonitor, config: RecoveryConfig) -> Self {
        Self {
            runner,
            monitor,
            config,
            active: Arc::new(Mutex::new(HashMap::new())),
            archive: Arc::new(Mutex::new(VecDeque::new())),
            stats: Arc::new(RwLock::new(LearningStats::new())),
            loops: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Start a session for `issue`, unless every slot is taken.
    pub async fn trigger(&self, project_id: &str, issue: HealthIssue) -> TriggerOutcome {
        let mut active = self.active.lock().await;
        self.archive_finished(&mut active).await;

        if active.len() >= self.config.max_concurrent_sessions {
            tracing::warn!(
                project_id,
                issue_id = %issue.id,
                active = active.len(),
                max = self.config.max_concurrent_sessions,
                "recovery capacity reached, session not triggered"
            );
            return TriggerOutcome::NotTriggered {
                reason: format!(
                    "capacity reached ({}/{} active sessions)",
                    active.len(),
                    self.config.max_concurrent_sessions
                ),
            };
        }

        let issue_id = issue.id;
        let session = RecoverySession::new(project_id, issue);
        let session_id = session.id;
        let shared: SharedSession = Arc::new(RwLock::new(session));

        let runner = self.runner.clone();
        let driven = shared.clone();
        let handle = tokio::spawn(async move {
            runner.run(driven).await;
        });

        active.insert(
            session_id,
            ActiveSession {
                session: shared,
                issue_id,
                project_id: project_id.to_string(),
                started: Instant::now(),
                handle,
            },
        );
        tracing::info!(project_id, %session_id, %issue_id, "recovery session triggered");
        TriggerOutcome::Triggered { session_id }
    }

    /// Turn an externally observed failure into an issue and trigger on it.
    pub async fn report_failure(
        &self,
        project_id: &str,
        error: &str,
        location: &str,
    ) -> TriggerOutcome {
        let summary = error.lines().next().unwrap_or(error).trim();
        let issue = HealthIssue::new(
            IssueType::Runtime,
            REPORTED_FAILURE_SEVERITY,
            summary.to_string(),
            location.to_string(),
        )
        .with_error_text(error);
        self.trigger(project_id, issue).await
    }

    /// One pass of the periodic sweep for `project_id`.
    pub async fn sweep(&self, project_id: &str) {
        if let Some(report) = self.monitor.latest_report(project_id).await {
            let emergency = self.monitor.emergency_severity();
            for issue in report.issues {
                let repeated = issue.occurrence_count > self.config.repetition_threshold;
                if issue.severity < emergency && !repeated {
                    continue;
                }
                if self.has_active_session_for(issue.id).await {
                    continue;
                }
                self.trigger(project_id, issue).await;
            }
        }

        self.enforce_timeouts().await;

        let mut active = self.active.lock().await;
        self.archive_finished(&mut active).await;
    }

    /// Fail every live session that exceeded its time budget.
    pub async fn enforce_timeouts(&self) -> usize {
        let budget = Duration::from_secs(self.config.session_timeout_secs);
        let active = self.active.lock().await;
        let mut timed_out = 0;
        for (session_id, entry) in active.iter() {
            if entry.started.elapsed() <= budget {
                continue;
            }
            let mut session = entry.session.write().await;
            if session.is_terminal() {
                continue;
            }
            entry.handle.abort();
            if session.fail(FailureReason::Timeout).is_ok() {
                timed_out += 1;
                tracing::warn!(
                    %session_id,
                    project_id = %entry.project_id,
                    phase = ?session.visited.iter().rev().nth(1),
                    "recovery session timed out"
                );
            }
        }
        timed_out
    }

    /// Bind the health monitor and spawn the sweep loop for `project_id`.
    ///
    /// Returns `false` if the loop is already running for the project.
    pub async fn start(&self, project_id: &str) -> bool {
        self.start_with_interval(project_id, self.monitor.default_interval()).await
    }

    /// Same as [`RecoveryLoop::start`] with health checks every
    /// `check_interval` instead of the configured monitor interval.
    pub async fn start_with_interval(&self, project_id: &str, check_interval: Duration) -> bool {
        if check_interval.is_zero() {
            tracing::warn!(
                project_id,
                "refusing to start recovery loop with a zero check interval"
            );
            return false;
        }
        let mut loops = self.loops.lock().await;
        if loops.contains_key(project_id) {
            tracing::warn!(project_id, "recovery loop already running for project");
            return false;
        }

        self.monitor.start(project_id, check_interval).await;

        let (shutdown_tx, mut sweep_shutdown) = broadcast::channel(1);
        let mut listener_shutdown = shutdown_tx.subscribe();
        let sweep_interval = Duration::from_secs(self.config.sweep_interval_secs);

        let orchestrator = self.clone();
        let project = project_id.to_string();
        let sweep = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);

            // Skip first tick (fires immediately)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => orchestrator.sweep(&project).await,
                    _ = sweep_shutdown.recv() => break,
                }
            }
            tracing::debug!(project_id = %project, "sweep loop stopped");
        });

        let orchestrator = self.clone();
        let project = project_id.to_string();
        let mut emergencies = self.monitor.subscribe_emergencies();
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    signal = emergencies.recv() => match signal {
                        Ok(signal) if signal.project_id == project => {
                            for issue in signal.issues {
                                if !orchestrator.has_active_session_for(issue.id).await {
                                    orchestrator.trigger(&project, issue).await;
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            tracing::warn!(
                                project_id = %project,
                                missed,
                                "emergency signals dropped"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = listener_shutdown.recv() => break,
                }
            }
        });

        loops.insert(
            project_id.to_string(),
            LoopHandle {
                shutdown_tx,
                sweep,
                listener,
            },
        );
        tracing::info!(project_id, "recovery loop started");
        true
    }

    /// Unbind the monitor, cancel the sweep, and fail in-flight sessions
    /// of `project_id` as stopped.
    pub async fn stop(&self, project_id: &str) -> bool {
        let handle = self.loops.lock().await.remove(project_id);
        self.monitor.stop(project_id).await;
        let stopped = self.stop_sessions(Some(project_id)).await;

        let Some(handle) = handle else {
            return false;
        };
        shutdown(handle);
        tracing::info!(project_id, stopped_sessions = stopped, "recovery loop stopped");
        true
    }

    /// Stop every project loop and every in-flight session.
    pub async fn stop_all(&self) {
        let drained: Vec<(String, LoopHandle)> = self.loops.lock().await.drain().collect();
        for (_, handle) in drained {
            shutdown(handle);
        }
        self.monitor.stop_all().await;
        let stopped = self.stop_sessions(None).await;
        tracing::info!(stopped_sessions = stopped, "recovery loop shut down");
    }

    async fn stop_sessions(&self, project_id: Option<&str>) -> usize {
        let mut active = self.active.lock().await;
        let mut stopped = 0;
        for entry in active.values() {
            if project_id.is_some_and(|p| p != entry.project_id) {
                continue;
            }
            entry.handle.abort();
            let mut session = entry.session.write().await;
            if session.fail(FailureReason::Stopped).is_ok() {
                stopped += 1;
            }
        }
        self.archive_finished(&mut active).await;
        stopped
    }

    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    async fn has_active_session_for(&self, issue_id: Uuid) -> bool {
        let active = self.active.lock().await;
        for entry in active.values() {
            if entry.issue_id == issue_id && !entry.session.read().await.is_terminal() {
                return true;
            }
        }
        false
    }

    /// Look up a session in the active set or the archive.
    pub async fn get_session(&self, session_id: Uuid) -> Option<RecoverySession> {
        if let Some(entry) = self.active.lock().await.get(&session_id) {
            return Some(entry.session.read().await.clone());
        }
        self.archive
            .lock()
            .await
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    /// Wait until `session_id` is terminal and return it.
    pub async fn wait_for(&self, session_id: Uuid, poll: Duration) -> Option<RecoverySession> {
        loop {
            let session = self.get_session(session_id).await?;
            if session.is_terminal() {
                return Some(session);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Archived sessions, oldest first.
    pub async fn archived(&self) -> Vec<RecoverySession> {
        self.archive.lock().await.iter().cloned().collect()
    }

    pub async fn stats(&self) -> LearningStats {
        self.stats.read().await.clone()
    }

    pub async fn status(&self) -> RecoveryStatus {
        let mut active_sessions = Vec::new();
        {
            let active = self.active.lock().await;
            for (session_id, entry) in active.iter() {
                let session = entry.session.read().await;
                active_sessions.push(ActiveSessionInfo {
                    session_id: *session_id,
                    project_id: entry.project_id.clone(),
                    issue_type: session.issue.issue_type,
                    severity: session.issue.severity,
                    phase: session.phase,
                    elapsed_secs: entry.started.elapsed().as_secs(),
                });
            }
        }
        active_sessions.sort_by_key(|s| std::cmp::Reverse(s.elapsed_secs));

        RecoveryStatus {
            max_concurrent_sessions: self.config.max_concurrent_sessions,
            active_sessions,
            archived_sessions: self.archive.lock().await.len(),
            monitored_projects: self.loops.lock().await.keys().cloned().collect(),
            stats: self.stats().await,
        }
    }

    /// Move terminal sessions into the archive and refresh statistics.
    async fn archive_finished(&self, active: &mut HashMap<Uuid, ActiveSession>) {
        let mut finished = Vec::new();
        for (id, entry) in active.iter() {
            if entry.session.read().await.is_terminal() {
                finished.push(*id);
            }
        }
        if finished.is_empty() {
            return;
        }

        let mut archive = self.archive.lock().await;
        for id in finished {
            if let Some(entry) = active.remove(&id) {
                let session = entry.session.read().await.clone();
                tracing::info!(
                    session_id = %session.id,
                    project_id = %session.project_id,
                    success = session.success,
                    reason = ?session.failure_reason,
                    "recovery session archived"
                );
                archive.push_back(session);
            }
        }
        while archive.len() > self.config.archive_limit.max(1) {
            archive.pop_front();
        }

        let stats = LearningStats::from_records(archive.iter().filter_map(|s| s.learning.as_ref()));
        *self.stats.write().await = stats;
    }
}

fn shutdown(handle: LoopHandle) {
    if handle.shutdown_tx.send(()).is_err() {
        handle.sweep.abort();
        handle.listener.abort();
    }
}
