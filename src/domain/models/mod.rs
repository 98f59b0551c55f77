pub mod config;
pub mod health;
pub mod plan;
pub mod recovery;
pub mod solution;
pub mod work_item;
pub mod workflow;

pub use config::{
    CommandProbeConfig, Config, LoggingConfig, MonitorConfig, RecoveryConfig, SchedulerConfig,
};
pub use health::{HealthIssue, HealthReport, HealthStatus, IssueType};
pub use plan::{ExecutionPhase, ExecutionPlan};
pub use recovery::{
    FailureReason, LearningRecord, PhaseLogEntry, RecoveryPhase, RecoverySession, TriggerOutcome,
};
pub use solution::{best_solution, ActionOutcome, AnalysisResult, Solution, SolutionType};
pub use work_item::{Capability, WorkItem, WorkItemStatus};
pub use workflow::Workflow;
