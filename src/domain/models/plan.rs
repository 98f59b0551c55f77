//! Execution plan for phase-based work item execution.
//!
//! A plan partitions a workflow's work items into ordered phases. Items in a
//! phase have every dependency satisfied by an earlier phase and can run
//! concurrently. When the graph contains a cycle (or a dependency that can
//! never be satisfied), the leftover items are flushed into one trailing
//! fallback phase and the plan is flagged.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::work_item::WorkItem;

/// A phase of the plan: items that can execute concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPhase {
    /// Phase number (0-indexed).
    pub index: usize,
    /// Work item ids in declaration order.
    pub item_ids: Vec<String>,
    /// Whether this phase is the trailing cycle fallback.
    #[serde(default)]
    pub fallback: bool,
}

impl ExecutionPhase {
    pub fn new(index: usize, item_ids: Vec<String>) -> Self {
        Self {
            index,
            item_ids,
            fallback: false,
        }
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}

/// Ordered phases plus the resolved items and duration estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub phases: Vec<ExecutionPhase>,
    /// Items in declaration order, with dependencies resolved to ids.
    pub items: Vec<WorkItem>,
    /// Sum of every item's estimate (fully serial execution).
    pub sequential_duration_secs: u64,
    /// Sum of per-phase maxima (full parallelism inside a phase).
    pub parallel_duration_secs: u64,
    /// The longest item of each phase, concatenated across phases.
    pub critical_path: Vec<String>,
    /// Set when the trailing fallback phase had to be used.
    #[serde(default)]
    pub cycle_detected: bool,
    /// Items placed in the fallback phase.
    #[serde(default)]
    pub unresolved_ids: Vec<String>,
}

impl ExecutionPlan {
    pub fn empty() -> Self {
        Self {
            phases: Vec::new(),
            items: Vec::new(),
            sequential_duration_secs: 0,
            parallel_duration_secs: 0,
            critical_path: Vec::new(),
            cycle_detected: false,
            unresolved_ids: Vec::new(),
        }
    }

    pub fn total_phases(&self) -> usize {
        self.phases.len()
    }

    pub fn total_items(&self) -> usize {
        self.phases.iter().map(ExecutionPhase::item_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get_item(&self, id: &str) -> Option<&WorkItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Index of the phase containing `id`.
    pub fn phase_of(&self, id: &str) -> Option<usize> {
        self.phases
            .iter()
            .find(|phase| phase.item_ids.iter().any(|item_id| item_id == id))
            .map(|phase| phase.index)
    }

    pub fn all_item_ids(&self) -> Vec<String> {
        self.phases
            .iter()
            .flat_map(|phase| phase.item_ids.iter().cloned())
            .collect()
    }

    /// Ratio of serial to phased duration; 1.0 for an empty plan.
    pub fn parallel_speedup(&self) -> f64 {
        if self.parallel_duration_secs == 0 {
            return 1.0;
        }
        self.sequential_duration_secs as f64 / self.parallel_duration_secs as f64
    }

    /// Validate the plan structure.
    ///
    /// Checks that phases are sequential and non-empty, that every item
    /// appears in exactly one phase, and that every dependency edge points to
    /// a strictly earlier phase. Edges into the fallback phase are exempt.
    pub fn validate(&self) -> Result<(), String> {
        let mut phase_of: HashMap<&str, usize> = HashMap::new();

        for (idx, phase) in self.phases.iter().enumerate() {
            if phase.index != idx {
                return Err(format!(
                    "Phase {} has incorrect index {}",
                    idx, phase.index
                ));
            }
            if phase.is_empty() {
                return Err(format!("Phase {idx} is empty"));
            }
            for id in &phase.item_ids {
                if phase_of.insert(id.as_str(), idx).is_some() {
                    return Err(format!("Duplicate item ID found: {id}"));
                }
            }
        }

        let declared: HashSet<&str> = self.items.iter().map(|i| i.id.as_str()).collect();
        for id in &declared {
            if !phase_of.contains_key(id) {
                return Err(format!("Item {id} is not assigned to any phase"));
            }
        }

        for item in &self.items {
            let Some(&item_phase) = phase_of.get(item.id.as_str()) else {
                continue;
            };
            if self.phases[item_phase].fallback {
                continue;
            }
            for dep in &item.dependencies {
                match phase_of.get(dep.as_str()) {
                    Some(&dep_phase) if dep_phase < item_phase => {}
                    Some(&dep_phase) => {
                        return Err(format!(
                            "Item {} in phase {} depends on {} in phase {}",
                            item.id, item_phase, dep, dep_phase
                        ));
                    }
                    None => {
                        return Err(format!("Item {} depends on unknown item {}", item.id, dep));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::work_item::Capability;

    fn plan_of(phases: Vec<Vec<&str>>, items: Vec<WorkItem>) -> ExecutionPlan {
        ExecutionPlan {
            phases: phases
                .into_iter()
                .enumerate()
                .map(|(i, ids)| ExecutionPhase::new(i, ids.into_iter().map(String::from).collect()))
                .collect(),
            items,
            ..ExecutionPlan::empty()
        }
    }

    #[test]
    fn test_empty_plan() {
        let plan = ExecutionPlan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.total_items(), 0);
        assert!((plan.parallel_speedup() - 1.0).abs() < f64::EPSILON);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_phase_lookup() {
        let a = WorkItem::new("a", Capability::Backend);
        let b = WorkItem::new("b", Capability::Frontend).with_dependencies(["a"]);
        let plan = plan_of(vec![vec!["a"], vec!["b"]], vec![a, b]);

        assert_eq!(plan.phase_of("a"), Some(0));
        assert_eq!(plan.phase_of("b"), Some(1));
        assert_eq!(plan.phase_of("zzz"), None);
        assert_eq!(plan.all_item_ids(), vec!["a".to_string(), "b".to_string()]);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_backward_edge() {
        let a = WorkItem::new("a", Capability::Backend).with_dependencies(["b"]);
        let b = WorkItem::new("b", Capability::Frontend);
        let plan = plan_of(vec![vec!["a"], vec!["b"]], vec![a, b]);

        let err = plan.validate().unwrap_err();
        assert!(err.contains("depends on b"));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_empty_phases() {
        let a = WorkItem::new("a", Capability::Ops);
        let dup = plan_of(vec![vec!["a"], vec!["a"]], vec![a.clone()]);
        assert!(dup.validate().unwrap_err().contains("Duplicate"));

        let empty = plan_of(vec![vec!["a"], vec![]], vec![a]);
        assert!(empty.validate().unwrap_err().contains("empty"));
    }

    #[test]
    fn test_validate_exempts_fallback_phase() {
        let a = WorkItem::new("a", Capability::Ops).with_dependencies(["b"]);
        let b = WorkItem::new("b", Capability::Ops).with_dependencies(["a"]);
        let mut plan = plan_of(vec![vec!["a", "b"]], vec![a, b]);
        plan.phases[0].fallback = true;
        assert!(plan.validate().is_ok());
    }
}
