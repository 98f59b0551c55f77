//! Implementer and validator ports - apply a solution and check the result.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionOutcome, RecoverySession, Solution};

/// Applies a chosen solution.
#[async_trait]
pub trait Implementer: Send + Sync {
    async fn apply(&self, solution: &Solution) -> DomainResult<ActionOutcome>;
}

/// Checks that an applied solution actually resolved the issue.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn check(&self, session: &RecoverySession) -> DomainResult<ActionOutcome>;
}
