//! Application services.

pub mod graph_builder;
pub mod handler_registry;
pub mod health_monitor;
pub mod learning;
pub mod phase_executor;
pub mod recovery_loop;
pub mod recovery_session;

pub use graph_builder::GraphBuilder;
pub use handler_registry::HandlerRegistry;
pub use health_monitor::{classify, health_score, EmergencySignal, HealthMonitor, CRITICAL_SEVERITY};
pub use learning::{IssueTypeStats, LearningStats};
pub use phase_executor::{
    failure_issue, ExecutionEvent, ExecutionStatus, ExecutorConfig, PhaseExecutor, RunSummary,
};
pub use recovery_loop::{ActiveSessionInfo, RecoveryLoop, RecoveryStatus};
pub use recovery_session::{SessionPolicy, SessionRunner, SharedSession};
