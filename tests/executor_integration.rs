//! End-to-end tests for planning and executing workflows.

mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use medic::domain::models::{Capability, Config, WorkItem, WorkItemStatus, Workflow};
use medic::domain::DomainError;
use medic::services::{
    ExecutionEvent, ExecutionStatus, ExecutorConfig, GraphBuilder, HealthMonitor, PhaseExecutor,
    RecoveryLoop,
};

fn abc() -> Vec<WorkItem> {
    vec![
        WorkItem::new("A", Capability::Backend).with_duration_secs(30),
        WorkItem::new("B", Capability::Frontend)
            .with_dependencies(["A"])
            .with_duration_secs(20),
        WorkItem::new("C", Capability::Reviewer)
            .with_dependencies(["A"])
            .with_duration_secs(45),
    ]
}

#[test]
fn test_fan_out_plan_shape_and_durations() {
    let plan = GraphBuilder::new().build(abc()).unwrap();

    let phases: Vec<Vec<&str>> = plan
        .phases
        .iter()
        .map(|p| p.item_ids.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(phases, vec![vec!["A"], vec!["B", "C"]]);
    assert_eq!(plan.parallel_duration_secs, 30 + 45);
    assert_eq!(plan.sequential_duration_secs, 30 + 20 + 45);
    assert_eq!(plan.critical_path, vec!["A".to_string(), "C".to_string()]);
    assert!(!plan.cycle_detected);
}

#[test]
fn test_cycle_is_lenient_by_default_and_strict_on_request() {
    let items = vec![
        WorkItem::new("root", Capability::Ops),
        WorkItem::new("x", Capability::Backend).with_dependencies(["y"]),
        WorkItem::new("y", Capability::Backend).with_dependencies(["x"]),
    ];

    let plan = GraphBuilder::new().build(items.clone()).unwrap();
    assert_eq!(plan.phases.len(), 2);
    assert!(plan.phases[1].fallback);
    assert!(plan.cycle_detected);

    let mut config = Config::default();
    config.scheduler.strict_cycles = true;
    let err = GraphBuilder::from_config(&config.scheduler).build(items).unwrap_err();
    assert!(matches!(err, DomainError::DependencyCycle(ids) if ids.len() == 2));
}

#[tokio::test]
async fn test_run_isolates_failures_and_counts_outcomes() {
    common::setup_test_logging();
    let mut items = abc();
    items[1] = items[1].clone().with_param("fail", json!(true));
    let plan = GraphBuilder::new().build(items).unwrap();

    let executor = PhaseExecutor::new(common::simulated_registry(), ExecutorConfig::default());
    let summary = executor.execute(&plan).await;

    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.status(), ExecutionStatus::PartialSuccess);
    let c = summary.items.iter().find(|i| i.id == "C").unwrap();
    assert_eq!(c.status, WorkItemStatus::Completed);
    let b = summary.items.iter().find(|i| i.id == "B").unwrap();
    assert_eq!(b.error.as_deref(), Some("simulated failure"));
}

#[tokio::test]
async fn test_event_stream_brackets_the_run() {
    let plan = GraphBuilder::new().build(abc()).unwrap();
    let executor = PhaseExecutor::new(common::simulated_registry(), ExecutorConfig::default());

    let (tx, mut rx) = mpsc::channel(64);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });
    let summary = executor.execute_with_events(&plan, tx).await;
    let events = collector.await.unwrap();

    assert!(matches!(
        events.first(),
        Some(ExecutionEvent::Started {
            total_items: 3,
            phase_count: 2
        })
    ));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::Completed {
            status: ExecutionStatus::Completed,
            ..
        })
    ));
    let completed = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::ItemCompleted { .. }))
        .count();
    assert_eq!(completed, summary.completed);
}

#[tokio::test]
async fn test_failed_items_open_recovery_sessions() {
    let config = Config::default();
    let monitor = HealthMonitor::new(vec![], config.monitor.clone());
    let recovery = Arc::new(RecoveryLoop::new(
        common::template_runner(true),
        monitor,
        config.recovery.clone(),
    ));

    let items = vec![
        WorkItem::new("migrate", Capability::Ops)
            .with_priority(9)
            .with_param("fail", json!(true))
            .with_param("error", json!("connection refused")),
        WorkItem::new("lint", Capability::Reviewer),
    ];
    let plan = GraphBuilder::new().build(items).unwrap();
    let executor = PhaseExecutor::new(common::simulated_registry(), ExecutorConfig::default())
        .with_recovery(recovery.clone(), "shop");
    let summary = executor.execute(&plan).await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.critical_failures, vec!["migrate".to_string()]);

    for _ in 0..200 {
        recovery.sweep("shop").await;
        if recovery.active_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let archived = recovery.archived().await;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].project_id, "shop");
    assert!(archived[0].issue.description.contains("migrate"));
}

#[tokio::test]
async fn test_workflow_file_plans_and_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("release.yaml");
    std::fs::write(
        &path,
        r"
items:
  - id: schema
    capability: backend
    estimated_duration_secs: 5
  - id: ui
    capability: frontend
    depends_on: [schema]
  - id: review
    capability: reviewer
    depends_on: [ui, schema]
",
    )
    .unwrap();

    let workflow = Workflow::from_file(&path).unwrap();
    assert_eq!(workflow.name, "release");
    let plan = GraphBuilder::new().build(workflow.items).unwrap();
    assert_eq!(plan.phases.len(), 3);

    let executor = PhaseExecutor::new(common::simulated_registry(), ExecutorConfig::default());
    let summary = executor.execute(&plan).await;
    assert_eq!(summary.status(), ExecutionStatus::Completed);
    assert!((summary.success_rate() - 1.0).abs() < f64::EPSILON);
}
