//! `medic monitor`

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{configured_probes, recovery_loop, SessionBrief};
use crate::adapters::CommandProbe;
use crate::cli::output::progress::create_spinner;
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::MonitorArgs;
use crate::domain::models::{Config, HealthReport, IssueType};
use crate::domain::ports::HealthProbe;
use crate::services::LearningStats;

#[derive(Debug, Serialize)]
struct MonitorOutput {
    project: String,
    reports: Vec<HealthReport>,
    sessions: Vec<SessionBrief>,
    stats: LearningStats,
}

impl CommandOutput for MonitorOutput {
    fn to_human(&self) -> String {
        let table = TableFormatter::new();
        let mut lines = vec![
            format!("Project '{}': {} health checks", self.project, self.reports.len()),
            table.format_reports(&self.reports),
        ];
        if let Some(latest) = self.reports.last() {
            lines.extend(latest.recommendations.iter().map(|r| format!("  - {r}")));
        }
        if !self.sessions.is_empty() {
            lines.push("Recovery sessions:".to_string());
            lines.extend(self.sessions.iter().map(SessionBrief::line));
            lines.push(table.format_stats(&self.stats));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: MonitorArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut probes = configured_probes(config)?;
    for (n, command) in args.probes.iter().enumerate() {
        let probe = CommandProbe::new(format!("probe-{}", n + 1), command)
            .with_issue(IssueType::Runtime, 8);
        probes.push(Arc::new(probe) as Arc<dyn HealthProbe>);
    }
    if probes.is_empty() {
        tracing::warn!("no probes configured; every check will report a healthy project");
    }

    let interval_secs = args.interval_secs.unwrap_or(config.monitor.interval_secs);
    let interval = Duration::from_secs(interval_secs.max(1));
    let recovery = recovery_loop(config, probes);
    let monitor = recovery.monitor().clone();
    recovery.start_with_interval(&args.project, interval).await;

    let spinner = create_spinner(format!("monitoring {}", args.project), json_mode);
    // The monitor runs its first check on start; wait for the remaining ones.
    for cycle in 1..args.cycles.max(1) {
        tokio::time::sleep(interval).await;
        spinner.set_message(format!("monitoring {} (cycle {})", args.project, cycle + 1));
        recovery.sweep(&args.project).await;
    }
    // Let sessions triggered by the last check settle before stopping.
    tokio::time::sleep(Duration::from_millis(100)).await;
    recovery.sweep(&args.project).await;
    spinner.finish_and_clear();

    recovery.stop(&args.project).await;
    let sessions = recovery.archived().await.iter().map(SessionBrief::from).collect();

    output(
        &MonitorOutput {
            reports: monitor.history(&args.project).await,
            project: args.project,
            sessions,
            stats: recovery.stats().await,
        },
        json_mode,
    );
    Ok(())
}
