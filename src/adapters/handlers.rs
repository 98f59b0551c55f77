//! Simulated capability handlers.
//!
//! Useful for dry runs and tests: the handler sleeps for the item's
//! `delay_ms` parameter (or its estimated duration when `scale_estimates`
//! is set), then succeeds unless the item asks it to `fail` or `panic`.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Capability, WorkItem};
use crate::domain::ports::CapabilityHandler;

/// Capability handler that simulates work.
#[derive(Debug, Clone)]
pub struct SimulatedHandler {
    capability: Capability,
    /// Milliseconds of simulated work per estimated second.
    estimate_scale_ms: Option<u64>,
}

impl SimulatedHandler {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            estimate_scale_ms: None,
        }
    }

    /// Sleep `ms_per_sec` milliseconds for every estimated second of work
    /// when the item carries no explicit `delay_ms`.
    pub fn with_estimate_scale(mut self, ms_per_sec: u64) -> Self {
        self.estimate_scale_ms = Some(ms_per_sec);
        self
    }

    /// One handler per known capability.
    pub fn all() -> Vec<Self> {
        Capability::all().into_iter().map(Self::new).collect()
    }

    fn delay_for(&self, item: &WorkItem) -> Duration {
        if let Some(ms) = item.params.get("delay_ms").and_then(Value::as_u64) {
            return Duration::from_millis(ms);
        }
        match self.estimate_scale_ms {
            Some(scale) => {
                Duration::from_millis(item.estimated_duration_secs.saturating_mul(scale))
            }
            None => Duration::ZERO,
        }
    }
}

fn flag(item: &WorkItem, name: &str) -> bool {
    item.params.get(name).and_then(Value::as_bool).unwrap_or(false)
}

#[async_trait]
impl CapabilityHandler for SimulatedHandler {
    fn capability(&self) -> Capability {
        self.capability
    }

    async fn execute(&self, item: &WorkItem) -> DomainResult<Value> {
        let delay = self.delay_for(item);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if flag(item, "panic") {
            panic!("simulated panic in {}", item.id);
        }
        if flag(item, "fail") {
            let message = item
                .params
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("simulated failure")
                .to_string();
            return Err(DomainError::ExecutionFailed(message));
        }

        tracing::debug!(item_id = %item.id, capability = %self.capability, "simulated item done");
        Ok(json!({
            "item": item.id,
            "capability": self.capability.as_str(),
            "simulated": true,
        }))
    }
}
