//! Graph builder: turns declared work items into a phased execution plan.
//!
//! Dependencies may reference an item by id or by name. References are
//! resolved against ids first and names second; unknown references and
//! self-references are dropped. Phases are then peeled off repeatedly: every
//! item whose dependencies all sit in earlier phases joins the next phase.
//! When no item qualifies but some remain, the remainder is flushed into one
//! trailing fallback phase (lenient mode) or rejected (strict mode).

use std::collections::{HashMap, HashSet};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ExecutionPhase, ExecutionPlan, SchedulerConfig, WorkItem};

/// Builds execution plans from work items.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    strict: bool,
}

impl GraphBuilder {
    /// Lenient builder: cycles degrade into a trailing fallback phase.
    pub fn new() -> Self {
        Self { strict: false }
    }

    /// Strict builder: cycles are reported as `DomainError::DependencyCycle`.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            strict: config.strict_cycles,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Build a plan, rejecting duplicate ids and, in strict mode, cycles.
    pub fn build(&self, items: Vec<WorkItem>) -> DomainResult<ExecutionPlan> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(DomainError::DuplicateWorkItem(item.id.clone()));
            }
        }

        let plan = self.plan(items);
        if self.strict && plan.cycle_detected {
            return Err(DomainError::DependencyCycle(plan.unresolved_ids));
        }
        Ok(plan)
    }

    /// Build a plan without failing. Later items reusing an id are dropped.
    pub fn plan(&self, items: Vec<WorkItem>) -> ExecutionPlan {
        let mut seen = HashSet::new();
        let mut items: Vec<WorkItem> = items
            .into_iter()
            .filter(|item| {
                let fresh = seen.insert(item.id.clone());
                if !fresh {
                    tracing::warn!(item_id = %item.id, "dropping work item with duplicate id");
                }
                fresh
            })
            .collect();

        resolve_dependencies(&mut items);

        let mut phases: Vec<ExecutionPhase> = Vec::new();
        let mut assigned: HashSet<String> = HashSet::new();
        let mut remaining: Vec<usize> = (0..items.len()).collect();
        let mut cycle_detected = false;
        let mut unresolved_ids = Vec::new();

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<usize>, Vec<usize>) = remaining
                .iter()
                .partition(|&&idx| items[idx].dependencies.iter().all(|d| assigned.contains(d)));

            if ready.is_empty() {
                unresolved_ids = blocked.iter().map(|&idx| items[idx].id.clone()).collect();
                tracing::warn!(
                    unresolved = ?unresolved_ids,
                    "dependency cycle detected, placing remaining items in a fallback phase"
                );
                let mut phase = ExecutionPhase::new(phases.len(), unresolved_ids.clone());
                phase.fallback = true;
                phases.push(phase);
                cycle_detected = true;
                break;
            }

            let ids: Vec<String> = ready.iter().map(|&idx| items[idx].id.clone()).collect();
            tracing::debug!(phase = phases.len(), items = ?ids, "phase assembled");
            assigned.extend(ids.iter().cloned());
            phases.push(ExecutionPhase::new(phases.len(), ids));
            remaining = blocked;
        }

        let mut plan = ExecutionPlan {
            phases,
            items,
            cycle_detected,
            unresolved_ids,
            ..ExecutionPlan::empty()
        };
        compute_estimates(&mut plan);

        tracing::info!(
            phases = plan.total_phases(),
            items = plan.total_items(),
            sequential_secs = plan.sequential_duration_secs,
            parallel_secs = plan.parallel_duration_secs,
            cycle_detected = plan.cycle_detected,
            "execution plan built"
        );
        plan
    }
}

/// Rewrite each item's dependency references as item ids.
pub fn resolve_dependencies(items: &mut [WorkItem]) {
    let ids: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();
    let mut by_name: HashMap<String, String> = HashMap::new();
    for item in items.iter() {
        if !item.name.is_empty() {
            by_name
                .entry(item.name.clone())
                .or_insert_with(|| item.id.clone());
        }
    }

    for item in items.iter_mut() {
        let mut resolved: Vec<String> = Vec::with_capacity(item.dependencies.len());
        for reference in &item.dependencies {
            let target = if ids.contains(reference) {
                Some(reference.clone())
            } else {
                by_name.get(reference).cloned()
            };

            match target {
                Some(id) if id == item.id => {
                    tracing::warn!(item_id = %item.id, "ignoring self dependency");
                }
                Some(id) => {
                    if !resolved.contains(&id) {
                        resolved.push(id);
                    }
                }
                None => {
                    tracing::warn!(
                        item_id = %item.id,
                        dependency = %reference,
                        "ignoring unknown dependency"
                    );
                }
            }
        }
        item.dependencies = resolved;
    }
}

fn compute_estimates(plan: &mut ExecutionPlan) {
    let durations: HashMap<&str, u64> = plan
        .items
        .iter()
        .map(|i| (i.id.as_str(), i.estimated_duration_secs))
        .collect();

    let mut parallel = 0u64;
    let mut critical_path = Vec::with_capacity(plan.phases.len());
    for phase in &plan.phases {
        let mut longest: Option<(&str, u64)> = None;
        for id in &phase.item_ids {
            let secs = durations.get(id.as_str()).copied().unwrap_or(0);
            if longest.map_or(true, |(_, best)| secs > best) {
                longest = Some((id.as_str(), secs));
            }
        }
        if let Some((id, secs)) = longest {
            parallel = parallel.saturating_add(secs);
            critical_path.push(id.to_string());
        }
    }

    plan.sequential_duration_secs = durations.values().fold(0u64, |acc, s| acc.saturating_add(*s));
    plan.parallel_duration_secs = parallel;
    plan.critical_path = critical_path;
}
