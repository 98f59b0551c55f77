//! Table output using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use super::truncate;
use crate::domain::models::{
    ExecutionPlan, HealthReport, HealthStatus, RecoveryPhase, RecoverySession, WorkItem,
    WorkItemStatus,
};
use crate::services::LearningStats;

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: console::colors_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { use_colors: false }
    }

    /// One row per phase with its items and the phase's longest estimate.
    pub fn format_plan(&self, plan: &ExecutionPlan) -> String {
        let mut table = base_table();
        table.set_header(header(&["Phase", "Items", "Longest (s)", "Note"]));

        for phase in &plan.phases {
            let longest = phase
                .item_ids
                .iter()
                .filter_map(|id| plan.get_item(id))
                .map(|item| item.estimated_duration_secs)
                .max()
                .unwrap_or(0);
            let note = if phase.fallback {
                self.colored("cycle fallback", Color::Yellow)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                Cell::new(phase.index + 1),
                Cell::new(phase.item_ids.join(", ")),
                Cell::new(longest),
                note,
            ]);
        }
        table.to_string()
    }

    /// Per-item outcome of a run.
    pub fn format_items(&self, items: &[WorkItem]) -> String {
        let mut table = base_table();
        table.set_header(header(&[
            "Item",
            "Capability",
            "Priority",
            "Status",
            "Duration",
            "Error",
        ]));

        for item in items {
            let duration = item
                .actual_duration()
                .map_or_else(|| "-".to_string(), |d| format!("{}ms", d.as_millis()));
            table.add_row(vec![
                Cell::new(&item.id),
                Cell::new(item.capability),
                Cell::new(item.priority),
                self.colored(item.status, status_color(item.status)),
                Cell::new(duration),
                Cell::new(item.error.as_deref().map_or_else(String::new, |e| truncate(e, 50))),
            ]);
        }
        table.to_string()
    }

    /// Phase log of one recovery session.
    pub fn format_session_log(&self, session: &RecoverySession) -> String {
        let mut table = base_table();
        table.set_header(header(&["Time", "Phase", "Message"]));

        for entry in &session.log {
            let color = match entry.phase {
                RecoveryPhase::Completed => Color::Green,
                RecoveryPhase::Failed => Color::Red,
                _ => Color::Cyan,
            };
            table.add_row(vec![
                Cell::new(entry.timestamp.format("%H:%M:%S%.3f")),
                self.colored(entry.phase, color),
                Cell::new(truncate(&entry.message, 80)),
            ]);
        }
        table.to_string()
    }

    pub fn format_reports(&self, reports: &[HealthReport]) -> String {
        let mut table = base_table();
        table.set_header(header(&["Time", "Status", "Score", "Issues", "Worst"]));

        for report in reports {
            let worst = report
                .issues
                .iter()
                .max_by_key(|i| i.severity)
                .map_or_else(String::new, |i| {
                    format!("[{}] {}", i.severity, truncate(&i.description, 40))
                });
            table.add_row(vec![
                Cell::new(report.timestamp.format("%H:%M:%S")),
                self.colored(report.status, health_color(report.status)),
                Cell::new(format!("{:.2}", report.score)),
                Cell::new(report.issues.len()),
                Cell::new(worst),
            ]);
        }
        table.to_string()
    }

    pub fn format_stats(&self, stats: &LearningStats) -> String {
        let mut table = base_table();
        table.set_header(header(&["Metric", "Value"]));

        let best = stats
            .most_effective_solution()
            .map_or_else(|| "-".to_string(), |(name, n)| format!("{name} ({n})"));
        let reasons = stats
            .failure_reasons
            .iter()
            .map(|(reason, n)| format!("{reason}: {n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = [
            ("Sessions", stats.total_sessions.to_string()),
            ("Succeeded", stats.successful_sessions.to_string()),
            ("Success rate", format!("{:.0}%", stats.success_rate * 100.0)),
            ("Mean healing time", format!("{:.0}ms", stats.mean_healing_ms)),
            ("Most effective", best),
            ("Failure reasons", if reasons.is_empty() { "-".to_string() } else { reasons }),
        ];
        for (metric, value) in rows {
            table.add_row(vec![Cell::new(metric), Cell::new(value)]);
        }
        table.to_string()
    }

    fn colored(&self, value: impl ToString, color: Color) -> Cell {
        let cell = Cell::new(value.to_string());
        if self.use_colors {
            cell.fg(color)
        } else {
            cell
        }
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

const fn status_color(status: WorkItemStatus) -> Color {
    match status {
        WorkItemStatus::Completed => Color::Green,
        WorkItemStatus::Failed => Color::Red,
        WorkItemStatus::Cancelled => Color::DarkGrey,
        WorkItemStatus::Running => Color::Cyan,
        WorkItemStatus::Pending => Color::White,
    }
}

const fn health_color(status: HealthStatus) -> Color {
    match status {
        HealthStatus::Excellent | HealthStatus::Good => Color::Green,
        HealthStatus::Warning => Color::Yellow,
        HealthStatus::Failing | HealthStatus::Critical => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Capability;
    use crate::services::GraphBuilder;

    #[test]
    fn test_plan_table_lists_phases() {
        let plan = GraphBuilder::new().plan(vec![
            WorkItem::new("a", Capability::Backend).with_duration_secs(10),
            WorkItem::new("b", Capability::Frontend)
                .with_dependencies(["a"])
                .with_duration_secs(20),
        ]);
        let out = TableFormatter::plain().format_plan(&plan);
        assert!(out.contains("Phase"));
        assert!(out.contains('a'));
        assert!(out.contains("20"));
    }

    #[test]
    fn test_stats_table_handles_empty() {
        let out = TableFormatter::plain().format_stats(&LearningStats::new());
        assert!(out.contains("Sessions"));
        assert!(out.contains('-'));
    }
}
