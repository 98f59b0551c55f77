//! Recovery session state machine model.
//!
//! A session walks one issue through the canonical phase order
//! `detection → analysis → solution_generation → implementation →
//! validation → learning → completed`. The only legal moves are to the next
//! phase in that order or to `failed`, and terminal sessions never move again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::health::{HealthIssue, IssueType};
use super::solution::{ActionOutcome, AnalysisResult, Solution, SolutionType};
use crate::domain::errors::{DomainError, DomainResult};

/// Phase of a recovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPhase {
    Detection,
    Analysis,
    SolutionGeneration,
    Implementation,
    Validation,
    Learning,
    Completed,
    Failed,
}

impl RecoveryPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detection => "detection",
            Self::Analysis => "analysis",
            Self::SolutionGeneration => "solution_generation",
            Self::Implementation => "implementation",
            Self::Validation => "validation",
            Self::Learning => "learning",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Next phase on the success path.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Detection => Some(Self::Analysis),
            Self::Analysis => Some(Self::SolutionGeneration),
            Self::SolutionGeneration => Some(Self::Implementation),
            Self::Implementation => Some(Self::Validation),
            Self::Validation => Some(Self::Learning),
            Self::Learning => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == Self::Failed || self.next() == Some(target)
    }

    /// The success-path order, `detection` through `completed`.
    pub fn canonical_order() -> [Self; 7] {
        [
            Self::Detection,
            Self::Analysis,
            Self::SolutionGeneration,
            Self::Implementation,
            Self::Validation,
            Self::Learning,
            Self::Completed,
        ]
    }
}

impl fmt::Display for RecoveryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended in `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum FailureReason {
    NoSolutionsGenerated,
    ManualInterventionRequired,
    ImplementationFailed,
    ValidationFailed,
    Timeout,
    Stopped,
    Unexpected(String),
}

impl FailureReason {
    /// Histogram key; unexpected failures share one bucket.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoSolutionsGenerated => "no solutions generated",
            Self::ManualInterventionRequired => "manual intervention required",
            Self::ImplementationFailed => "implementation failed",
            Self::ValidationFailed => "validation failed",
            Self::Timeout => "timeout",
            Self::Stopped => "stopped",
            Self::Unexpected(_) => "unexpected",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unexpected(msg) => write!(f, "unexpected: {msg}"),
            other => f.write_str(other.category()),
        }
    }
}

/// One audit entry in a session's phase log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLogEntry {
    pub timestamp: DateTime<Utc>,
    pub phase: RecoveryPhase,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

/// Outcome data captured when a session ends, for aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub session_id: Uuid,
    pub project_id: String,
    pub issue_type: IssueType,
    pub solution_type: Option<SolutionType>,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

/// One state-machine instance tracking the repair of a single issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverySession {
    pub id: Uuid,
    pub project_id: String,
    pub issue: HealthIssue,
    pub phase: RecoveryPhase,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub analysis: Option<AnalysisResult>,
    pub solutions: Vec<Solution>,
    pub applied_solution: Option<Solution>,
    pub validation: Option<ActionOutcome>,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    /// Phases entered, in order, starting with `detection`.
    pub visited: Vec<RecoveryPhase>,
    pub log: Vec<PhaseLogEntry>,
    pub learning: Option<LearningRecord>,
}

impl RecoverySession {
    /// Open a session in `detection` for `issue`.
    pub fn new(project_id: impl Into<String>, issue: HealthIssue) -> Self {
        let now = Utc::now();
        let message = format!(
            "{} issue detected (severity {}): {}",
            issue.issue_type, issue.severity, issue.description
        );
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.into(),
            issue,
            phase: RecoveryPhase::Detection,
            started_at: now,
            ended_at: None,
            analysis: None,
            solutions: Vec::new(),
            applied_solution: None,
            validation: None,
            success: false,
            failure_reason: None,
            visited: vec![RecoveryPhase::Detection],
            log: vec![PhaseLogEntry {
                timestamp: now,
                phase: RecoveryPhase::Detection,
                message,
                payload: None,
            }],
            learning: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Move forward to `target`, which must be the next canonical phase.
    pub fn advance_to(
        &mut self,
        target: RecoveryPhase,
        message: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> DomainResult<()> {
        if target == RecoveryPhase::Failed || !self.phase.can_transition_to(target) {
            return Err(DomainError::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: target.to_string(),
            });
        }

        self.enter(target, message.into(), payload);
        if target == RecoveryPhase::Completed {
            self.success = true;
            self.finish();
        }
        Ok(())
    }

    /// Terminate the session as `failed` with `reason`.
    pub fn fail(&mut self, reason: FailureReason) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: RecoveryPhase::Failed.to_string(),
            });
        }

        let message = format!("failed during {}: {}", self.phase, reason);
        self.enter(RecoveryPhase::Failed, message, None);
        self.success = false;
        self.failure_reason = Some(reason);
        self.finish();
        Ok(())
    }

    /// Append a note to the log without changing phase.
    pub fn note(&mut self, message: impl Into<String>, payload: Option<serde_json::Value>) {
        self.log.push(PhaseLogEntry {
            timestamp: Utc::now(),
            phase: self.phase,
            message: message.into(),
            payload,
        });
    }

    pub fn elapsed(&self) -> Duration {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }

    /// Whether a non-terminal session has run longer than `budget`.
    pub fn is_timed_out(&self, budget: Duration) -> bool {
        !self.is_terminal() && self.elapsed() > budget
    }

    fn enter(&mut self, phase: RecoveryPhase, message: String, payload: Option<serde_json::Value>) {
        self.phase = phase;
        self.visited.push(phase);
        self.log.push(PhaseLogEntry {
            timestamp: Utc::now(),
            phase,
            message,
            payload,
        });
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.learning = Some(LearningRecord {
            session_id: self.id,
            project_id: self.project_id.clone(),
            issue_type: self.issue.issue_type,
            solution_type: self.applied_solution.as_ref().map(|s| s.solution_type),
            success: self.success,
            failure_reason: self.failure_reason.clone(),
            duration_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            recorded_at: now,
        });
    }
}

/// Result of asking the orchestrator to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TriggerOutcome {
    Triggered { session_id: Uuid },
    NotTriggered { reason: String },
}

impl TriggerOutcome {
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::Triggered { session_id } => Some(*session_id),
            Self::NotTriggered { .. } => None,
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered { .. })
    }
}
