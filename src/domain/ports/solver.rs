//! Solver port - generates candidate solutions for an analysed issue.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnalysisResult, HealthIssue, Solution};

/// Produces candidate solutions ranked by confidence, highest first.
///
/// An empty list is a valid answer and ends the session with
/// "no solutions generated".
#[async_trait]
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate_solutions(
        &self,
        analysis: &AnalysisResult,
        issue: &HealthIssue,
        project_id: &str,
    ) -> DomainResult<Vec<Solution>>;
}
