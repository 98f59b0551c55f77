//! `medic run`

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{recovery_loop, SessionBrief};
use crate::adapters::SimulatedHandler;
use crate::cli::output::progress::{create_progress_bar, ProgressBarExt};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::RunArgs;
use crate::domain::models::{Config, Workflow};
use crate::services::{
    ExecutionEvent, ExecutionStatus, ExecutorConfig, GraphBuilder, HandlerRegistry, PhaseExecutor,
    RunSummary,
};

const SESSION_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Serialize)]
struct RunOutput {
    workflow: String,
    status: ExecutionStatus,
    success_rate: f64,
    summary: RunSummary,
    recovery_sessions: Vec<SessionBrief>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let s = &self.summary;
        let mut lines = vec![
            TableFormatter::new().format_items(&s.items),
            format!(
                "Workflow '{}' {:?}: {} completed, {} failed, {} cancelled \
                 ({:.0}% success, avg {}ms/item, {}ms total)",
                self.workflow,
                self.status,
                s.completed,
                s.failed,
                s.cancelled,
                self.success_rate * 100.0,
                s.average_item_duration_ms,
                s.total_duration_ms
            ),
        ];
        if !s.critical_failures.is_empty() {
            lines.push(format!("Critical failures: {}", s.critical_failures.join(", ")));
        }
        if !self.recovery_sessions.is_empty() {
            lines.push("Recovery sessions:".to_string());
            lines.extend(self.recovery_sessions.iter().map(SessionBrief::line));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let workflow = Workflow::from_file(&args.file)
        .with_context(|| format!("Failed to load workflow {}", args.file.display()))?;
    let plan = GraphBuilder::from_config(&config.scheduler).build(workflow.items)?;

    let mut registry = HandlerRegistry::new();
    for handler in SimulatedHandler::all() {
        registry.register(Arc::new(handler.with_estimate_scale(args.time_scale_ms)));
    }

    let mut executor_config = ExecutorConfig::from(&config.scheduler);
    if args.max_concurrency.is_some() {
        executor_config.max_concurrency = args.max_concurrency;
    }
    let mut executor = PhaseExecutor::new(Arc::new(registry), executor_config);

    let recovery = if args.recover {
        let recovery = Arc::new(recovery_loop(config, Vec::new()));
        executor = executor.with_recovery(recovery.clone(), &args.project);
        Some(recovery)
    } else {
        None
    };

    let progress = create_progress_bar(plan.total_items() as u64, json_mode);
    let (tx, mut rx) = mpsc::channel(64);
    let bar = progress.clone();
    let listener = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ExecutionEvent::PhaseStarted { phase, item_count } => {
                    bar.set_message(format!("phase {} ({item_count} items)", phase + 1));
                }
                ExecutionEvent::ItemCompleted { .. }
                | ExecutionEvent::ItemFailed { .. }
                | ExecutionEvent::ItemCancelled { .. } => bar.inc(1),
                _ => {}
            }
        }
    });

    let summary = executor.execute_with_events(&plan, tx).await;
    let _ = listener.await;
    if summary.failed == 0 {
        progress.finish_success("done");
    } else {
        progress.finish_error(format!("{} item(s) failed", summary.failed));
    }

    let mut recovery_sessions = Vec::new();
    if let Some(recovery) = recovery {
        let budget = Duration::from_secs(config.recovery.session_timeout_secs);
        let waited = tokio::time::timeout(budget, async {
            while recovery.active_count().await > 0 {
                recovery.sweep(&args.project).await;
                tokio::time::sleep(SESSION_POLL).await;
            }
        })
        .await;
        if waited.is_err() {
            tracing::warn!("recovery sessions still running after the session budget");
        }
        recovery.stop_all().await;
        recovery_sessions = recovery.archived().await.iter().map(SessionBrief::from).collect();
    }

    output(
        &RunOutput {
            workflow: workflow.name,
            status: summary.status(),
            success_rate: summary.success_rate(),
            summary,
            recovery_sessions,
        },
        json_mode,
    );
    Ok(())
}
