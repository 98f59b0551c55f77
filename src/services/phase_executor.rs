//! Phase executor service for phase-based parallel work item execution.
//!
//! Phases run strictly in order. Within a phase every item is spawned as its
//! own task, bounded by a semaphore, and the executor waits for the whole
//! phase to settle before advancing. A failing (or panicking) item is
//! recorded on that item only; siblings and later phases still run, and
//! failed critical items are logged without halting the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::time::{timeout, Duration};

use crate::domain::models::{
    ExecutionPlan, HealthIssue, IssueType, SchedulerConfig, WorkItem, WorkItemStatus,
};
use crate::domain::ports::CapabilityHandler;
use crate::services::handler_registry::HandlerRegistry;
use crate::services::recovery_loop::RecoveryLoop;

/// Configuration for the phase executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Ceiling on concurrent items per phase; `None` uses the handler count.
    pub max_concurrency: Option<usize>,
    /// Items at or above this priority are critical.
    pub critical_priority: u8,
    /// Per-item timeout.
    pub item_timeout: Option<Duration>,
    /// Cancel items whose dependencies failed.
    pub skip_dependents_on_failure: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for ExecutorConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            critical_priority: config.critical_priority,
            item_timeout: config.item_timeout_secs.map(Duration::from_secs),
            skip_dependents_on_failure: config.skip_dependents_on_failure,
        }
    }
}

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Not started.
    Pending,
    /// Currently running.
    Running,
    /// Every item completed.
    Completed,
    /// Some items failed or were cancelled.
    PartialSuccess,
    /// No item completed.
    Failed,
    /// Cancelled before all phases ran.
    Canceled,
}

/// Event emitted during execution.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Execution started.
    Started { total_items: usize, phase_count: usize },
    /// Phase started.
    PhaseStarted { phase: usize, item_count: usize },
    /// Item handed to its handler.
    ItemStarted { item_id: String, capability: String },
    /// Item completed.
    ItemCompleted { item_id: String, duration_ms: u64 },
    /// Item failed.
    ItemFailed { item_id: String, error: String },
    /// Item cancelled without running.
    ItemCancelled { item_id: String, reason: String },
    /// Phase settled.
    PhaseCompleted {
        phase: usize,
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    },
    /// Critical items failed in a phase; execution continues.
    CriticalFailures { phase: usize, item_ids: Vec<String> },
    /// Execution completed.
    Completed { status: ExecutionStatus, summary: RunSummary },
}

/// Aggregate results of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total_items: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_duration_ms: u64,
    /// Mean wall time of items that ran.
    pub average_item_duration_ms: u64,
    pub critical_failures: Vec<String>,
    /// Final item states in declaration order.
    pub items: Vec<WorkItem>,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total_items as f64
    }

    pub fn status(&self) -> ExecutionStatus {
        if self.failed == 0 && self.cancelled == 0 {
            ExecutionStatus::Completed
        } else if self.completed > 0 {
            ExecutionStatus::PartialSuccess
        } else {
            ExecutionStatus::Failed
        }
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &WorkItem> {
        self.items
            .iter()
            .filter(|i| i.status == WorkItemStatus::Failed)
    }
}

/// What a spawned item task reports back.
struct ItemRun {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    outcome: Result<serde_json::Value, String>,
}

/// Executes plans phase by phase.
pub struct PhaseExecutor {
    registry: Arc<HandlerRegistry>,
    config: ExecutorConfig,
    recovery: Option<(Arc<RecoveryLoop>, String)>,
    status: Arc<RwLock<ExecutionStatus>>,
}

impl PhaseExecutor {
    pub fn new(registry: Arc<HandlerRegistry>, config: ExecutorConfig) -> Self {
        Self {
            registry,
            config,
            recovery: None,
            status: Arc::new(RwLock::new(ExecutionStatus::Pending)),
        }
    }

    /// Report failed items to `recovery` as orchestration issues of `project_id`.
    pub fn with_recovery(
        mut self,
        recovery: Arc<RecoveryLoop>,
        project_id: impl Into<String>,
    ) -> Self {
        self.recovery = Some((recovery, project_id.into()));
        self
    }

    /// Effective per-phase concurrency.
    pub fn concurrency_limit(&self) -> usize {
        let capabilities = self.registry.len();
        let limit = match self.config.max_concurrency {
            Some(ceiling) => ceiling.min(capabilities),
            None => capabilities,
        };
        limit.max(1)
    }

    /// Execute a plan.
    pub async fn execute(&self, plan: &ExecutionPlan) -> RunSummary {
        // No listener: a closed channel makes every send return immediately.
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        self.execute_with_events(plan, tx).await
    }

    /// Execute a plan with event streaming.
    pub async fn execute_with_events(
        &self,
        plan: &ExecutionPlan,
        event_tx: mpsc::Sender<ExecutionEvent>,
    ) -> RunSummary {
        let start_time = std::time::Instant::now();
        *self.status.write().await = ExecutionStatus::Running;

        let mut state: HashMap<String, WorkItem> = plan
            .items
            .iter()
            .map(|item| (item.id.clone(), item.clone()))
            .collect();
        let mut unsuccessful: HashSet<String> = HashSet::new();
        let mut critical_failures = Vec::new();

        tracing::info!(
            items = plan.total_items(),
            phases = plan.total_phases(),
            concurrency = self.concurrency_limit(),
            "execution started"
        );
        let _ = event_tx
            .send(ExecutionEvent::Started {
                total_items: plan.total_items(),
                phase_count: plan.total_phases(),
            })
            .await;

        for phase in &plan.phases {
            if *self.status.read().await == ExecutionStatus::Canceled {
                for id in &phase.item_ids {
                    if let Some(item) = state.get_mut(id) {
                        item.cancel("run cancelled");
                    }
                }
                continue;
            }

            let _ = event_tx
                .send(ExecutionEvent::PhaseStarted {
                    phase: phase.index,
                    item_count: phase.item_count(),
                })
                .await;

            let mut runnable = Vec::with_capacity(phase.item_count());
            for id in &phase.item_ids {
                let Some(item) = state.get_mut(id) else {
                    continue;
                };
                if self.config.skip_dependents_on_failure {
                    let failed_dep = item
                        .dependencies
                        .iter()
                        .find(|d| unsuccessful.contains(*d))
                        .cloned();
                    if let Some(dep) = failed_dep {
                        let reason = format!("dependency {dep} did not complete");
                        item.cancel(reason.clone());
                        unsuccessful.insert(id.clone());
                        let _ = event_tx
                            .send(ExecutionEvent::ItemCancelled {
                                item_id: id.clone(),
                                reason,
                            })
                            .await;
                        continue;
                    }
                }
                runnable.push(item.clone());
            }

            let finished = self.execute_phase(runnable, &event_tx).await;

            let mut succeeded = 0;
            let mut failed = 0;
            let mut phase_critical = Vec::new();
            let mut phase_failed_items = Vec::new();
            for item in finished {
                match item.status {
                    WorkItemStatus::Completed => succeeded += 1,
                    _ => {
                        failed += 1;
                        unsuccessful.insert(item.id.clone());
                        if item.priority >= self.config.critical_priority {
                            phase_critical.push(item.id.clone());
                        }
                        phase_failed_items.push(item.clone());
                    }
                }
                state.insert(item.id.clone(), item);
            }
            let cancelled = phase.item_count() - succeeded - failed;

            tracing::info!(
                phase = phase.index,
                succeeded,
                failed,
                cancelled,
                "phase completed"
            );
            let _ = event_tx
                .send(ExecutionEvent::PhaseCompleted {
                    phase: phase.index,
                    succeeded,
                    failed,
                    cancelled,
                })
                .await;

            if !phase_critical.is_empty() {
                tracing::warn!(
                    phase = phase.index,
                    items = ?phase_critical,
                    "critical items failed, continuing in degraded mode"
                );
                let _ = event_tx
                    .send(ExecutionEvent::CriticalFailures {
                        phase: phase.index,
                        item_ids: phase_critical.clone(),
                    })
                    .await;
                critical_failures.extend(phase_critical);
            }

            self.report_failures(&phase_failed_items).await;
        }

        let items: Vec<WorkItem> = plan
            .items
            .iter()
            .filter_map(|item| state.remove(&item.id))
            .collect();
        let summary = summarize(items, critical_failures, start_time.elapsed());

        let final_status = {
            let mut status = self.status.write().await;
            if *status != ExecutionStatus::Canceled {
                *status = summary.status();
            }
            *status
        };

        tracing::info!(
            status = ?final_status,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            success_rate = summary.success_rate(),
            "execution finished"
        );
        let _ = event_tx
            .send(ExecutionEvent::Completed {
                status: final_status,
                summary: summary.clone(),
            })
            .await;

        summary
    }

    /// Run one phase's items concurrently and wait for all of them.
    async fn execute_phase(
        &self,
        items: Vec<WorkItem>,
        event_tx: &mpsc::Sender<ExecutionEvent>,
    ) -> Vec<WorkItem> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit()));
        let mut handles = Vec::with_capacity(items.len());
        let mut finished = Vec::with_capacity(items.len());

        for mut item in items {
            let Some(handler) = self.registry.get(item.capability) else {
                let error = format!("no handler registered for capability {}", item.capability);
                tracing::warn!(item_id = %item.id, %error, "item failed");
                item.fail(error.clone());
                let _ = event_tx
                    .send(ExecutionEvent::ItemFailed {
                        item_id: item.id.clone(),
                        error,
                    })
                    .await;
                finished.push(item);
                continue;
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    item.fail("concurrency limiter closed");
                    finished.push(item);
                    continue;
                }
            };

            let task_item = item.clone();
            let item_timeout = self.config.item_timeout;
            let event_tx = event_tx.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                execute_single_item(task_item, handler, item_timeout, event_tx).await
            });
            handles.push((item, handle));
        }

        for (mut item, handle) in handles {
            match handle.await {
                Ok(run) => {
                    item.start();
                    item.started_at = Some(run.started_at);
                    match run.outcome {
                        Ok(result) => item.complete(result),
                        Err(error) => item.fail(error),
                    }
                    // Handles are joined in declaration order; keep the
                    // time the item actually finished.
                    item.completed_at = Some(run.completed_at);
                }
                Err(join_err) => {
                    let error = if join_err.is_panic() {
                        format!("handler panicked: {}", panic_message(join_err.into_panic()))
                    } else {
                        "handler task was cancelled".to_string()
                    };
                    tracing::error!(item_id = %item.id, %error, "item task aborted");
                    item.start();
                    item.fail(error.clone());
                    let _ = event_tx
                        .send(ExecutionEvent::ItemFailed {
                            item_id: item.id.clone(),
                            error,
                        })
                        .await;
                }
            }
            finished.push(item);
        }

        finished
    }

    async fn report_failures(&self, failed: &[WorkItem]) {
        let Some((recovery, project_id)) = &self.recovery else {
            return;
        };
        for item in failed {
            let issue = failure_issue(item);
            let outcome = recovery.trigger(project_id, issue).await;
            tracing::info!(
                item_id = %item.id,
                outcome = ?outcome,
                "reported item failure to recovery loop"
            );
        }
    }

    /// Get current execution status.
    pub async fn status(&self) -> ExecutionStatus {
        *self.status.read().await
    }

    /// Cancel execution. Phases not yet started are skipped.
    pub async fn cancel(&self) {
        let mut status = self.status.write().await;
        if *status == ExecutionStatus::Running {
            *status = ExecutionStatus::Canceled;
        }
    }
}

/// Build the orchestration issue reported for a failed item.
pub fn failure_issue(item: &WorkItem) -> HealthIssue {
    let error = item.error.clone().unwrap_or_else(|| "unknown error".to_string());
    HealthIssue::new(
        IssueType::Orchestration,
        item.priority.max(5),
        format!("work item {} failed", item.id),
        format!("{}/{}", item.capability, item.id),
    )
    .with_error_text(error)
}

async fn execute_single_item(
    item: WorkItem,
    handler: Arc<dyn CapabilityHandler>,
    item_timeout: Option<Duration>,
    event_tx: mpsc::Sender<ExecutionEvent>,
) -> ItemRun {
    let started_at = Utc::now();
    let start = std::time::Instant::now();
    let _ = event_tx
        .send(ExecutionEvent::ItemStarted {
            item_id: item.id.clone(),
            capability: item.capability.to_string(),
        })
        .await;

    let outcome = match item_timeout {
        Some(limit) => match timeout(limit, handler.execute(&item)).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
        },
        None => handler.execute(&item).await.map_err(|e| e.to_string()),
    };

    let completed_at = Utc::now();
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    match &outcome {
        Ok(_) => {
            tracing::debug!(item_id = %item.id, duration_ms, "item completed");
            let _ = event_tx
                .send(ExecutionEvent::ItemCompleted {
                    item_id: item.id.clone(),
                    duration_ms,
                })
                .await;
        }
        Err(error) => {
            tracing::warn!(item_id = %item.id, %error, "item failed");
            let _ = event_tx
                .send(ExecutionEvent::ItemFailed {
                    item_id: item.id.clone(),
                    error: error.clone(),
                })
                .await;
        }
    }

    ItemRun {
        started_at,
        completed_at,
        outcome,
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn summarize(
    items: Vec<WorkItem>,
    critical_failures: Vec<String>,
    elapsed: std::time::Duration,
) -> RunSummary {
    let count = |status: WorkItemStatus| items.iter().filter(|i| i.status == status).count();
    let durations: Vec<u128> = items
        .iter()
        .filter(|i| matches!(i.status, WorkItemStatus::Completed | WorkItemStatus::Failed))
        .filter_map(WorkItem::actual_duration)
        .map(|d| d.as_millis())
        .collect();
    let average = if durations.is_empty() {
        0
    } else {
        durations.iter().sum::<u128>() / durations.len() as u128
    };

    RunSummary {
        total_items: items.len(),
        completed: count(WorkItemStatus::Completed),
        failed: count(WorkItemStatus::Failed),
        cancelled: count(WorkItemStatus::Cancelled),
        total_duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        average_item_duration_ms: u64::try_from(average).unwrap_or(u64::MAX),
        critical_failures,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::handlers::SimulatedHandler;
    use crate::domain::models::Capability;
    use crate::domain::errors::DomainResult;
    use crate::services::graph_builder::GraphBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<HandlerRegistry> {
        let mut registry = HandlerRegistry::new();
        for capability in Capability::all() {
            registry.register(Arc::new(SimulatedHandler::new(capability)));
        }
        Arc::new(registry)
    }

    fn item(id: &str, capability: Capability, deps: &[&str]) -> WorkItem {
        WorkItem::new(id, capability).with_dependencies(deps.iter().copied())
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let executor = PhaseExecutor::new(registry(), ExecutorConfig::default());
        let summary = executor.execute(&ExecutionPlan::empty()).await;
        assert_eq!(summary.total_items, 0);
        assert_eq!(summary.status(), ExecutionStatus::Completed);
        assert_eq!(executor.status().await, ExecutionStatus::Completed);
    }

    #[test]
    fn test_executor_config_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_concurrency, None);
        assert_eq!(config.critical_priority, 8);
        assert!(config.item_timeout.is_none());
        assert!(!config.skip_dependents_on_failure);
    }

    #[test]
    fn test_concurrency_limit() {
        let executor = PhaseExecutor::new(registry(), ExecutorConfig::default());
        assert_eq!(executor.concurrency_limit(), 4);

        let capped = PhaseExecutor::new(
            registry(),
            ExecutorConfig {
                max_concurrency: Some(2),
                ..ExecutorConfig::default()
            },
        );
        assert_eq!(capped.concurrency_limit(), 2);

        let empty = PhaseExecutor::new(Arc::new(HandlerRegistry::new()), ExecutorConfig::default());
        assert_eq!(empty.concurrency_limit(), 1);
    }

    #[test]
    fn test_success_rate() {
        let summary = RunSummary {
            total_items: 10,
            completed: 8,
            failed: 2,
            ..RunSummary::default()
        };
        assert!((summary.success_rate() - 0.8).abs() < 0.001);
        assert_eq!(summary.status(), ExecutionStatus::PartialSuccess);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings_or_later_phases() {
        let plan = GraphBuilder::new().plan(vec![
            item("a", Capability::Backend, &[]),
            item("bad", Capability::Backend, &[]).with_param("fail", serde_json::json!(true)),
            item("c", Capability::Frontend, &["a"]),
            item("d", Capability::Frontend, &["bad"]),
        ]);
        let executor = PhaseExecutor::new(registry(), ExecutorConfig::default());
        let summary = executor.execute(&plan).await;

        assert_eq!(summary.completed, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.completed + summary.failed, summary.total_items);
        let d = summary.items.iter().find(|i| i.id == "d").unwrap();
        assert_eq!(d.status, WorkItemStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_handler_fails_item() {
        let registry = Arc::new(HandlerRegistry::new().with_handler(Arc::new(
            SimulatedHandler::new(Capability::Backend),
        )));
        let plan = GraphBuilder::new().plan(vec![
            item("api", Capability::Backend, &[]),
            item("review", Capability::Reviewer, &[]),
        ]);
        let summary = PhaseExecutor::new(registry, ExecutorConfig::default())
            .execute(&plan)
            .await;

        let review = summary.items.iter().find(|i| i.id == "review").unwrap();
        assert_eq!(review.status, WorkItemStatus::Failed);
        assert_eq!(
            review.error.as_deref(),
            Some("no handler registered for capability reviewer")
        );
        assert_eq!(summary.completed, 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_captured() {
        let plan = GraphBuilder::new().plan(vec![
            item("boom", Capability::Ops, &[]).with_param("panic", serde_json::json!(true)),
            item("fine", Capability::Ops, &[]),
        ]);
        let summary = PhaseExecutor::new(registry(), ExecutorConfig::default())
            .execute(&plan)
            .await;

        let boom = summary.items.iter().find(|i| i.id == "boom").unwrap();
        assert_eq!(boom.status, WorkItemStatus::Failed);
        assert!(boom.error.as_deref().unwrap().starts_with("handler panicked"));
        assert_eq!(summary.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_item_timeout() {
        let plan = GraphBuilder::new().plan(vec![
            item("slow", Capability::Ops, &[]).with_param("delay_ms", serde_json::json!(5_000)),
        ]);
        let config = ExecutorConfig {
            item_timeout: Some(Duration::from_secs(1)),
            ..ExecutorConfig::default()
        };
        let summary = PhaseExecutor::new(registry(), config).execute(&plan).await;
        assert_eq!(summary.items[0].error.as_deref(), Some("timed out after 1s"));
    }

    #[tokio::test]
    async fn test_skip_dependents_on_failure() {
        let plan = GraphBuilder::new().plan(vec![
            item("bad", Capability::Backend, &[]).with_param("fail", serde_json::json!(true)),
            item("mid", Capability::Backend, &["bad"]),
            item("leaf", Capability::Frontend, &["mid"]),
            item("other", Capability::Frontend, &[]),
        ]);
        let config = ExecutorConfig {
            skip_dependents_on_failure: true,
            ..ExecutorConfig::default()
        };
        let summary = PhaseExecutor::new(registry(), config).execute(&plan).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.status(), ExecutionStatus::PartialSuccess);
    }

    #[tokio::test]
    async fn test_critical_failures_are_reported_not_fatal() {
        let plan = GraphBuilder::new().plan(vec![
            item("core", Capability::Backend, &[])
                .with_priority(9)
                .with_param("fail", serde_json::json!(true)),
            item("after", Capability::Frontend, &["core"]),
        ]);
        let (tx, mut rx) = mpsc::channel(64);
        let summary = PhaseExecutor::new(registry(), ExecutorConfig::default())
            .execute_with_events(&plan, tx)
            .await;

        assert_eq!(summary.critical_failures, vec!["core".to_string()]);
        assert_eq!(summary.completed, 1);

        let mut saw_critical = false;
        let mut saw_completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                ExecutionEvent::CriticalFailures { phase, item_ids } => {
                    assert_eq!(phase, 0);
                    assert_eq!(item_ids, vec!["core".to_string()]);
                    saw_critical = true;
                }
                ExecutionEvent::Completed { status, .. } => {
                    assert_eq!(status, ExecutionStatus::PartialSuccess);
                    saw_completed = true;
                }
                _ => {}
            }
        }
        assert!(saw_critical);
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn test_item_end_times_are_taken_when_each_item_finishes() {
        let plan = GraphBuilder::new().plan(vec![
            item("slow", Capability::Backend, &[]).with_param("delay_ms", serde_json::json!(400)),
            item("fast", Capability::Frontend, &[]),
        ]);
        assert_eq!(plan.phases.len(), 1);
        let summary = PhaseExecutor::new(registry(), ExecutorConfig::default())
            .execute(&plan)
            .await;

        let slow = summary.items.iter().find(|i| i.id == "slow").unwrap();
        let fast = summary.items.iter().find(|i| i.id == "fast").unwrap();
        assert!(slow.actual_duration().unwrap() >= Duration::from_millis(400));
        assert!(
            fast.actual_duration().unwrap() < Duration::from_millis(200),
            "fast item took {:?}",
            fast.actual_duration()
        );
        assert!(fast.completed_at < slow.completed_at);
        assert!(summary.average_item_duration_ms < 400);
    }

    /// Records the highest number of concurrent `execute` calls.
    struct PeakTracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CapabilityHandler for PeakTracker {
        fn capability(&self) -> Capability {
            Capability::Backend
        }

        async fn execute(&self, _item: &WorkItem) -> DomainResult<serde_json::Value> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(serde_json::json!({}))
        }
    }

    #[tokio::test]
    async fn test_semaphore_bounds_items_in_flight() {
        let tracker = Arc::new(PeakTracker {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut registry = HandlerRegistry::new();
        for capability in Capability::all() {
            registry.register(Arc::new(SimulatedHandler::new(capability)));
        }
        registry.register(tracker.clone());

        let items = (0..8)
            .map(|n| item(&format!("job-{n}"), Capability::Backend, &[]))
            .collect();
        let plan = GraphBuilder::new().plan(items);
        assert_eq!(plan.phases.len(), 1);

        let executor = PhaseExecutor::new(
            Arc::new(registry),
            ExecutorConfig {
                max_concurrency: Some(2),
                ..ExecutorConfig::default()
            },
        );
        assert_eq!(executor.concurrency_limit(), 2);
        let summary = executor.execute(&plan).await;

        assert_eq!(summary.completed, 8);
        let peak = tracker.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in-flight was {peak}");
        assert!(peak >= 1);
    }

    #[test]
    fn test_failure_issue_severity_floor() {
        let mut low = WorkItem::new("x", Capability::Ops).with_priority(2);
        low.fail("disk full");
        let issue = failure_issue(&low);
        assert_eq!(issue.issue_type, IssueType::Orchestration);
        assert_eq!(issue.severity, 5);
        assert_eq!(issue.error_text.as_deref(), Some("disk full"));

        let high = WorkItem::new("y", Capability::Ops).with_priority(9);
        assert_eq!(failure_issue(&high).severity, 9);
    }
}
