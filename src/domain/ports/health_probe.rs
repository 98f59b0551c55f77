//! Health probe port - one independently failable part of a health check.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::HealthIssue;

/// Inspects a project and reports the issues it finds.
///
/// A probe error is recorded on the report and does not abort the other
/// probes of the same check.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn probe(&self, project_id: &str) -> DomainResult<Vec<HealthIssue>>;
}
