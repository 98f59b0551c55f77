//! Capability handler port - executes work items of one capability.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Capability, WorkItem};

/// Executes work items tagged with a single capability.
///
/// The phase executor selects a handler from its registry by the item's
/// capability tag. An `Err` (or a panic) fails only the item being executed.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// The capability this handler serves.
    fn capability(&self) -> Capability;

    /// Execute one item and return its result payload.
    async fn execute(&self, item: &WorkItem) -> DomainResult<serde_json::Value>;
}
