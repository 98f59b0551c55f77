//! `medic heal`

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use super::session_runner;
use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::HealArgs;
use crate::domain::models::{Config, HealthIssue, IssueType, RecoverySession};

#[derive(Debug, Serialize)]
struct HealOutput {
    session: RecoverySession,
}

impl CommandOutput for HealOutput {
    fn to_human(&self) -> String {
        let s = &self.session;
        let mut lines = vec![
            format!("Session {} for '{}'", s.id, s.issue.description),
            TableFormatter::new().format_session_log(s),
        ];
        if let Some(analysis) = &s.analysis {
            lines.push(format!(
                "Analysis: {} (confidence {:.2}); causes: {}",
                analysis.primary_type,
                analysis.confidence,
                analysis.root_causes.join("; ")
            ));
        }
        for (rank, solution) in s.solutions.iter().enumerate() {
            lines.push(format!(
                "  {}. {} {:.2} - {}",
                rank + 1,
                solution.solution_type,
                solution.confidence,
                solution.description
            ));
        }
        match &s.failure_reason {
            None if s.success => lines.push("Outcome: healed".to_string()),
            Some(reason) => lines.push(format!("Outcome: failed ({reason})")),
            None => lines.push(format!("Outcome: {}", s.phase)),
        }
        lines.join("\n")
    }
}

pub async fn execute(args: HealArgs, config: &Config, json_mode: bool) -> Result<()> {
    let Some(issue_type) = IssueType::from_str(&args.issue_type) else {
        bail!("Unknown issue type: {}", args.issue_type);
    };
    if let Some(threshold) = args.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("Threshold must be between 0.0 and 1.0, got {threshold}");
        }
    }

    let mut config = config.clone();
    if let Some(threshold) = args.threshold {
        config.recovery.auto_apply_threshold = threshold;
    }
    if args.no_auto_apply {
        config.recovery.auto_apply_enabled = false;
    }

    let mut issue = HealthIssue::new(issue_type, args.severity, args.description, args.location);
    if let Some(error) = args.error {
        issue = issue.with_error_text(error);
    }

    let spinner = create_spinner("healing", json_mode);
    let runner = session_runner(&config, !args.fail_validation);
    let budget = Duration::from_secs(config.recovery.session_timeout_secs);
    let session = runner
        .run_within(RecoverySession::new(args.project, issue), budget)
        .await;
    if session.success {
        spinner.finish_success("session completed");
    } else {
        spinner.finish_error("session failed");
    }

    output(&HealOutput { session }, json_mode);
    Ok(())
}
