//! Handler Registry Service
//!
//! Maps capability tags to the handler that executes items of that capability.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::Capability;
use crate::domain::ports::CapabilityHandler;

/// Registry of capability handlers, keyed by capability tag.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Capability, Arc<dyn CapabilityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own capability, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) {
        let capability = handler.capability();
        if self.handlers.insert(capability, handler).is_some() {
            warn!(capability = %capability, "replacing existing capability handler");
        } else {
            debug!(capability = %capability, "registered capability handler");
        }
    }

    /// Builder-style registration.
    pub fn with_handler(mut self, handler: Arc<dyn CapabilityHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, capability: Capability) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(&capability).cloned()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.handlers.contains_key(&capability)
    }

    /// Registered capabilities in sorted order.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps: Vec<Capability> = self.handlers.keys().copied().collect();
        caps.sort();
        caps
    }

    /// Number of distinct registered capabilities.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
