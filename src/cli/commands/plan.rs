//! `medic plan`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::PlanArgs;
use crate::domain::models::{Config, ExecutionPlan, Workflow};
use crate::services::GraphBuilder;

#[derive(Debug, Serialize)]
struct PlanOutput {
    workflow: String,
    plan: ExecutionPlan,
}

impl CommandOutput for PlanOutput {
    fn to_human(&self) -> String {
        let plan = &self.plan;
        let mut lines = vec![
            format!(
                "Workflow '{}': {} items in {} phases",
                self.workflow,
                plan.total_items(),
                plan.total_phases()
            ),
            TableFormatter::new().format_plan(plan),
            format!(
                "Estimated duration: {}s parallel, {}s sequential ({:.1}x)",
                plan.parallel_duration_secs,
                plan.sequential_duration_secs,
                plan.parallel_speedup()
            ),
        ];
        if !plan.critical_path.is_empty() {
            lines.push(format!("Critical path: {}", plan.critical_path.join(" -> ")));
        }
        if plan.cycle_detected {
            lines.push(format!(
                "Warning: dependency cycle, items placed in a fallback phase: {}",
                plan.unresolved_ids.join(", ")
            ));
        }
        lines.join("\n")
    }
}

pub fn execute(args: PlanArgs, config: &Config, json_mode: bool) -> Result<()> {
    let workflow = Workflow::from_file(&args.file)
        .with_context(|| format!("Failed to load workflow {}", args.file.display()))?;

    let builder = if args.strict {
        GraphBuilder::strict()
    } else {
        GraphBuilder::from_config(&config.scheduler)
    };
    let plan = builder.build(workflow.items)?;

    output(
        &PlanOutput {
            workflow: workflow.name,
            plan,
        },
        json_mode,
    );
    Ok(())
}
