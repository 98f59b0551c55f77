//! Analyzer port - classifies a health issue and proposes root causes.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{AnalysisResult, HealthIssue};

/// Turns an issue's message, stack and context into a structured analysis.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, issue: &HealthIssue) -> DomainResult<AnalysisResult>;
}
