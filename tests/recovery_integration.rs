//! Recovery sessions and the orchestrating loop, driven through public APIs.

mod common;

use std::sync::Arc;
use std::time::Duration;

use medic::adapters::{
    HeuristicAnalyzer, ScriptedSolver, SimulatedImplementer, SimulatedValidator, StaticProbe,
};
use medic::domain::models::{
    FailureReason, HealthIssue, HealthStatus, IssueType, MonitorConfig, RecoveryConfig,
    RecoveryPhase, RecoverySession, Solution, SolutionType,
};
use medic::domain::ports::HealthProbe;
use medic::services::{HealthMonitor, RecoveryLoop, SessionPolicy, SessionRunner};

fn slow_runner(delay: Duration) -> SessionRunner {
    SessionRunner::new(
        Arc::new(HeuristicAnalyzer::new()),
        Arc::new(
            ScriptedSolver::new(vec![Solution::new(SolutionType::Restart, "restart", 0.9)])
                .with_delay(delay),
        ),
        Arc::new(SimulatedImplementer::new(true)),
        Arc::new(SimulatedValidator::new(true)),
        SessionPolicy::default(),
    )
}

fn crash(severity: u8) -> HealthIssue {
    HealthIssue::new(IssueType::Runtime, severity, "worker crashed", "worker")
}

#[tokio::test]
async fn test_low_confidence_solution_needs_manual_intervention() {
    let runner = common::scripted_runner(0.55, 0.8);
    let session = runner
        .run_to_end(RecoverySession::new("shop", crash(9)))
        .await;

    assert_eq!(session.phase, RecoveryPhase::Failed);
    assert_eq!(
        session.failure_reason,
        Some(FailureReason::ManualInterventionRequired)
    );
    assert!(session.applied_solution.is_none());
    assert!(!session.visited.contains(&RecoveryPhase::Implementation));
}

#[tokio::test]
async fn test_template_pipeline_heals_and_records_learning() {
    let runner = common::template_runner(true);
    let issue = crash(8).with_error_text("thread 'main' panicked: out of memory");
    let session = runner.run_to_end(RecoverySession::new("shop", issue)).await;

    assert!(session.success, "log: {:?}", session.log);
    assert_eq!(session.phase, RecoveryPhase::Completed);
    assert_eq!(session.visited, RecoveryPhase::canonical_order().to_vec());
    let learning = session.learning.expect("finished sessions carry a learning record");
    assert!(learning.success);
    assert!(learning.solution_type.is_some());
}

#[tokio::test]
async fn test_validation_failure_is_terminal() {
    let runner = common::template_runner(false);
    let session = runner.run_to_end(RecoverySession::new("shop", crash(8))).await;
    assert_eq!(session.failure_reason, Some(FailureReason::ValidationFailed));
    assert!(session.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_capacity_frees_when_a_session_finishes() {
    let config = RecoveryConfig::default();
    let monitor = HealthMonitor::new(vec![], MonitorConfig::default());
    let orch = RecoveryLoop::new(slow_runner(Duration::from_secs(10)), monitor, config);

    for _ in 0..3 {
        assert!(orch.trigger("shop", crash(9)).await.is_triggered());
    }
    assert!(!orch.trigger("shop", crash(9)).await.is_triggered());

    tokio::time::sleep(Duration::from_secs(11)).await;
    let outcome = orch.trigger("shop", crash(9)).await;
    assert!(outcome.is_triggered(), "finished sessions release their slots");
}

#[tokio::test(start_paused = true)]
async fn test_started_loop_times_out_sessions_on_sweep() {
    let config = RecoveryConfig {
        session_timeout_secs: 30,
        sweep_interval_secs: 10,
        ..RecoveryConfig::default()
    };
    let monitor = HealthMonitor::new(vec![], MonitorConfig::default());
    let orch = RecoveryLoop::new(slow_runner(Duration::from_secs(3600)), monitor, config);

    assert!(orch.start("shop").await);
    let id = orch.trigger("shop", crash(6)).await.session_id().unwrap();

    tokio::time::sleep(Duration::from_secs(45)).await;
    let session = orch.get_session(id).await.unwrap();
    assert_eq!(session.failure_reason, Some(FailureReason::Timeout));

    orch.stop_all().await;
    assert_eq!(orch.stats().await.failed_sessions, 1);
}

#[tokio::test]
async fn test_monitor_reports_feed_the_loop() {
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(StaticProbe::new("runtime", vec![crash(9)])),
        Arc::new(StaticProbe::healthy("lint")),
    ];
    let monitor = HealthMonitor::new(probes, MonitorConfig::default());
    let orch = RecoveryLoop::new(common::template_runner(true), monitor, RecoveryConfig::default());

    let report = orch.monitor().check_now("shop").await;
    assert_ne!(report.status, HealthStatus::Excellent);
    assert_eq!(report.issues.len(), 1);

    orch.sweep("shop").await;
    for _ in 0..200 {
        orch.sweep("shop").await;
        if orch.active_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let stats = orch.stats().await;
    assert_eq!(stats.total_sessions, 1);
    assert_eq!(stats.successful_sessions, 1);
}
