//! Recovery session runner.
//!
//! Drives one `RecoverySession` through analysis, solution generation,
//! optional auto-implementation, validation, and learning. The session is
//! shared with the orchestrator, which may force it into `failed` (timeout,
//! stop) at any moment; every write re-checks the phase under the lock and a
//! terminal session is never modified again.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::Instrument;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    best_solution, ActionOutcome, AnalysisResult, FailureReason, RecoveryConfig, RecoveryPhase,
    RecoverySession, Solution,
};
use crate::domain::ports::{Analyzer, Implementer, Solver, Validator};

/// A session shared between its runner and the orchestrator.
pub type SharedSession = Arc<RwLock<RecoverySession>>;

/// Auto-apply policy.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub auto_apply_enabled: bool,
    pub auto_apply_threshold: f64,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::from(&RecoveryConfig::default())
    }
}

impl From<&RecoveryConfig> for SessionPolicy {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            auto_apply_enabled: config.auto_apply_enabled,
            auto_apply_threshold: config.auto_apply_threshold,
        }
    }
}

/// The collaborators a session consumes.
#[derive(Clone)]
pub struct SessionRunner {
    analyzer: Arc<dyn Analyzer>,
    solver: Arc<dyn Solver>,
    implementer: Arc<dyn Implementer>,
    validator: Arc<dyn Validator>,
    policy: SessionPolicy,
}

impl SessionRunner {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        solver: Arc<dyn Solver>,
        implementer: Arc<dyn Implementer>,
        validator: Arc<dyn Validator>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            analyzer,
            solver,
            implementer,
            validator,
            policy,
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Run a standalone session to its terminal state.
    pub async fn run_to_end(&self, session: RecoverySession) -> RecoverySession {
        let shared = Arc::new(RwLock::new(session));
        self.run(shared.clone()).await;
        let finished = shared.read().await.clone();
        finished
    }

    /// Run a standalone session, failing it with `timeout` when it is not
    /// terminal within `budget`.
    pub async fn run_within(&self, session: RecoverySession, budget: Duration) -> RecoverySession {
        let shared = Arc::new(RwLock::new(session));
        if tokio::time::timeout(budget, self.run(shared.clone())).await.is_err() {
            let mut guard = shared.write().await;
            tracing::warn!(
                session_id = %guard.id,
                budget_secs = budget.as_secs(),
                "session exceeded its budget"
            );
            let _ = guard.fail(FailureReason::Timeout);
        }
        let finished = shared.read().await.clone();
        finished
    }

    /// Drive a shared session until it is terminal.
    pub async fn run(&self, session: SharedSession) {
        let (session_id, project_id) = {
            let s = session.read().await;
            (s.id, s.project_id.clone())
        };
        let span = tracing::info_span!("recovery_session", %session_id, %project_id);
        self.drive(&session).instrument(span).await;
    }

    async fn drive(&self, session: &SharedSession) {
        let (issue, project_id) = {
            let s = session.read().await;
            (s.issue.clone(), s.project_id.clone())
        };

        // analysis
        if !update(session, |s| {
            s.advance_to(
                RecoveryPhase::Analysis,
                format!("analyzing with {}", self.analyzer.name()),
                None,
            )
        })
        .await
        {
            return;
        }
        let analysis = match self.analyzer.analyze(&issue).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "analyzer failed, using fallback analysis");
                AnalysisResult::fallback(issue.issue_type, issue.severity)
            }
        };
        let payload = serde_json::to_value(&analysis).ok();
        if !update(session, |s| {
            s.analysis = Some(analysis.clone());
            s.note(
                format!("analysis complete (confidence {:.2})", analysis.confidence),
                payload,
            );
            Ok(())
        })
        .await
        {
            return;
        }

        // solution generation
        if !update(session, |s| {
            s.advance_to(
                RecoveryPhase::SolutionGeneration,
                format!("generating solutions with {}", self.solver.name()),
                None,
            )
        })
        .await
        {
            return;
        }
        let mut solutions = match self
            .solver
            .generate_solutions(&analysis, &issue, &project_id)
            .await
        {
            Ok(solutions) => solutions,
            Err(e) => {
                tracing::warn!(error = %e, "solver failed");
                update(session, |s| s.fail(FailureReason::Unexpected(e.to_string()))).await;
                return;
            }
        };
        if solutions.is_empty() {
            update(session, |s| s.fail(FailureReason::NoSolutionsGenerated)).await;
            return;
        }
        solutions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let Some(best) = best_solution(&solutions).cloned() else {
            return;
        };
        let candidates = solutions.len();
        if !update(session, |s| {
            s.solutions = solutions;
            s.note(
                format!(
                    "{candidates} candidate(s); best is {} at confidence {:.2}",
                    best.solution_type, best.confidence
                ),
                None,
            );
            Ok(())
        })
        .await
        {
            return;
        }

        if !self.should_auto_apply(&best) {
            tracing::info!(
                confidence = best.confidence,
                threshold = self.policy.auto_apply_threshold,
                auto_apply = self.policy.auto_apply_enabled,
                "solution not auto-applied, manual intervention required"
            );
            update(session, |s| {
                s.note(
                    "solution requires human approval",
                    serde_json::to_value(&best).ok(),
                );
                s.fail(FailureReason::ManualInterventionRequired)
            })
            .await;
            return;
        }

        // implementation
        if !update(session, |s| {
            s.applied_solution = Some(best.clone());
            s.advance_to(
                RecoveryPhase::Implementation,
                format!("applying {}: {}", best.solution_type, best.description),
                None,
            )
        })
        .await
        {
            return;
        }
        let applied = self.implementer.apply(&best).await;
        if let Some(error) = outcome_error(applied) {
            tracing::warn!(%error, "implementation failed");
            update(session, |s| {
                s.note(format!("implementation error: {error}"), None);
                s.fail(FailureReason::ImplementationFailed)
            })
            .await;
            return;
        }

        // validation
        if !update(session, |s| {
            s.advance_to(RecoveryPhase::Validation, "validating applied solution", None)
        })
        .await
        {
            return;
        }
        let snapshot = session.read().await.clone();
        let checked = self.validator.check(&snapshot).await;
        let validation = match checked {
            Ok(outcome) => outcome,
            Err(e) => ActionOutcome::failure(e.to_string()),
        };
        if !validation.success {
            tracing::warn!(error = ?validation.error, "validation failed");
            update(session, |s| {
                s.validation = Some(validation);
                s.fail(FailureReason::ValidationFailed)
            })
            .await;
            return;
        }

        // learning
        update(session, |s| {
            s.validation = Some(validation);
            s.advance_to(RecoveryPhase::Learning, "recording outcome", None)?;
            s.advance_to(RecoveryPhase::Completed, "issue resolved", None)
        })
        .await;
        tracing::info!("recovery session completed");
    }

    fn should_auto_apply(&self, solution: &Solution) -> bool {
        self.policy.auto_apply_enabled && solution.confidence >= self.policy.auto_apply_threshold
    }
}

fn outcome_error(result: DomainResult<ActionOutcome>) -> Option<String> {
    match result {
        Ok(outcome) if outcome.success => None,
        Ok(outcome) => Some(outcome.error.unwrap_or_else(|| "reported failure".to_string())),
        Err(e) => Some(e.to_string()),
    }
}

/// Apply `change` unless the session already ended. Returns whether the
/// session is still live afterwards.
async fn update<F>(session: &SharedSession, change: F) -> bool
where
    F: FnOnce(&mut RecoverySession) -> DomainResult<()>,
{
    let mut guard = session.write().await;
    if guard.is_terminal() {
        tracing::debug!(phase = %guard.phase, "session already terminal, dropping late update");
        return false;
    }
    if let Err(e) = change(&mut guard) {
        tracing::error!(error = %e, "invalid session transition");
        let _ = guard.fail(FailureReason::Unexpected(e.to_string()));
        return false;
    }
    !guard.is_terminal()
}
