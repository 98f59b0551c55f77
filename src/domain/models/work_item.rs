//! Work item domain model.
//!
//! Work items are the units a workflow is planned from. They declare their
//! dependencies by id or by name and are executed by the capability handler
//! matching their capability tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Capability tag selecting which handler executes an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Frontend,
    Backend,
    Reviewer,
    Ops,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Backend => "backend",
            Self::Reviewer => "reviewer",
            Self::Ops => "ops",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "frontend" => Some(Self::Frontend),
            "backend" => Some(Self::Backend),
            "reviewer" => Some(Self::Reviewer),
            "ops" => Some(Self::Ops),
            _ => None,
        }
    }

    /// All known capabilities.
    pub fn all() -> [Self; 4] {
        [Self::Frontend, Self::Backend, Self::Reviewer, Self::Ops]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work with declared dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: String,
    /// Human-readable name; dependencies may reference it instead of the id.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub capability: Capability,
    /// Priority from 0 (lowest) to 10 (highest).
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Dependency references (ids or names), resolved before execution.
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub estimated_duration_secs: u64,

    #[serde(default)]
    pub status: WorkItemStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

const fn default_priority() -> u8 {
    5
}

impl WorkItem {
    /// Create a pending work item. The name defaults to the id.
    pub fn new(id: impl Into<String>, capability: Capability) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            capability,
            priority: default_priority(),
            dependencies: Vec::new(),
            params: HashMap::new(),
            estimated_duration_secs: 0,
            status: WorkItemStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(10);
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = secs;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Mark the item as running.
    pub fn start(&mut self) {
        self.status = WorkItemStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Record a successful result.
    pub fn complete(&mut self, result: serde_json::Value) {
        self.status = WorkItemStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    /// Record a failure.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = WorkItemStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.status = WorkItemStatus::Cancelled;
        self.error = Some(reason.into());
        self.completed_at = Some(Utc::now());
    }

    /// Wall-clock time between start and end, if both are recorded.
    pub fn actual_duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }

    pub fn estimated_duration(&self) -> Duration {
        Duration::from_secs(self.estimated_duration_secs)
    }
}
