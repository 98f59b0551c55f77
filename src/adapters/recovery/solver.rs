//! Solution generators.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AnalysisResult, HealthIssue, IssueType, Solution, SolutionType};
use crate::domain::ports::Solver;

/// Candidate fix template: type, description, base confidence, complexity,
/// estimated minutes.
type Template = (SolutionType, &'static str, f64, u8, u32);

fn catalogue(issue_type: IssueType) -> &'static [Template] {
    use SolutionType::{
        CodePatch, ConfigurationFix, DependencyFix, ResourceTuning, Restart, Retry, Rollback,
        SecurityPatch,
    };
    match issue_type {
        IssueType::Dependency => &[
            (DependencyFix, "reinstall dependencies from the lockfile", 0.9, 2, 5),
            (DependencyFix, "pin the failing package to its last working version", 0.75, 3, 10),
        ],
        IssueType::Config => &[
            (ConfigurationFix, "restore the default value for the invalid setting", 0.85, 2, 5),
            (Rollback, "roll back to the last known good configuration", 0.7, 3, 10),
        ],
        IssueType::Runtime => &[
            (CodePatch, "guard the failing code path against the invalid state", 0.7, 5, 30),
            (Restart, "restart the affected service", 0.6, 1, 2),
        ],
        IssueType::Syntax => &[(
            CodePatch,
            "fix the malformed source at the reported location",
            0.8,
            3,
            15,
        )],
        IssueType::Logic => &[(CodePatch, "correct the faulty business rule", 0.5, 6, 60)],
        IssueType::Performance => &[
            (ResourceTuning, "raise resource limits for the slow component", 0.7, 3, 15),
            (Restart, "restart to release exhausted resources", 0.6, 1, 2),
        ],
        IssueType::Security => &[
            (
                SecurityPatch,
                "rotate exposed credentials and patch the vulnerable component",
                0.65,
                6,
                45,
            ),
            (Rollback, "roll back to the last audited release", 0.6, 3, 10),
        ],
        IssueType::Api => &[
            (Retry, "retry the failing calls with backoff", 0.75, 2, 5),
            (CodePatch, "handle the unexpected response shape", 0.55, 4, 30),
        ],
        IssueType::Database => &[
            (Retry, "retry after the lock or connection clears", 0.65, 2, 5),
            (CodePatch, "apply the missing schema migration", 0.6, 5, 30),
        ],
        IssueType::Integration => &[
            (Retry, "retry once the downstream service is reachable", 0.7, 1, 5),
            (ConfigurationFix, "point the client at a healthy endpoint", 0.55, 3, 15),
        ],
        IssueType::System => &[
            (Restart, "restart the host process", 0.7, 1, 2),
            (ResourceTuning, "free disk space and memory", 0.6, 3, 15),
        ],
        IssueType::Orchestration => &[
            (Retry, "re-run the failed work item", 0.85, 1, 5),
            (Rollback, "roll back the partially applied phase", 0.6, 4, 20),
        ],
    }
}

/// Generates candidates from a fixed per-issue-type catalogue. Confidence is
/// the template's base scaled by the analysis confidence.
#[derive(Debug, Clone, Default)]
pub struct TemplateSolver;

impl TemplateSolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Solver for TemplateSolver {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate_solutions(
        &self,
        analysis: &AnalysisResult,
        issue: &HealthIssue,
        project_id: &str,
    ) -> DomainResult<Vec<Solution>> {
        // Low-confidence analysis drags every candidate down, but never
        // below half of its base confidence.
        let scale = 0.5 + 0.5 * analysis.confidence;
        let mut solutions: Vec<Solution> = catalogue(analysis.primary_type)
            .iter()
            .map(|&(solution_type, description, base, complexity, minutes)| {
                Solution::new(solution_type, description, base * scale)
                    .with_complexity(complexity)
                    .with_estimate_minutes(minutes)
                    .with_targets([issue.location.clone()])
                    .with_steps([
                        format!("locate {} in project {project_id}", issue.location),
                        description.to_string(),
                    ])
                    .with_rollback([format!("revert changes to {}", issue.location)])
                    .with_verification([
                        "re-run the health probes",
                        "confirm the issue no longer reproduces",
                    ])
            })
            .collect();

        if analysis.severity >= 8 {
            for solution in &mut solutions {
                solution.risks.push("critical issue: verify in staging first".to_string());
            }
        }
        solutions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        tracing::debug!(
            issue_type = %analysis.primary_type,
            candidates = solutions.len(),
            "template solutions generated"
        );
        Ok(solutions)
    }
}

/// Solver returning a fixed list of candidates, optionally after a delay or
/// with an error. Meant for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSolver {
    solutions: Vec<Solution>,
    delay: Option<Duration>,
    error: Option<String>,
}

impl ScriptedSolver {
    pub fn new(solutions: Vec<Solution>) -> Self {
        Self {
            solutions,
            delay: None,
            error: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Solver for ScriptedSolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate_solutions(
        &self,
        _analysis: &AnalysisResult,
        _issue: &HealthIssue,
        _project_id: &str,
    ) -> DomainResult<Vec<Solution>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.error {
            return Err(DomainError::collaborator("scripted solver", message.clone()));
        }
        Ok(self.solutions.clone())
    }
}
