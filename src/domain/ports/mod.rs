//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces for every collaborator the engine consumes:
//! - CapabilityHandler: executes work items of one capability
//! - HealthProbe: one part of a project health check
//! - Analyzer / Solver: diagnose an issue and propose solutions
//! - Implementer / Validator: apply a solution and verify it
//!
//! Adapters in `crate::adapters` implement these; services depend only on the
//! traits.

pub mod analyzer;
pub mod capability_handler;
pub mod health_probe;
pub mod implementer;
pub mod solver;

pub use analyzer::Analyzer;
pub use capability_handler::CapabilityHandler;
pub use health_probe::HealthProbe;
pub use implementer::{Implementer, Validator};
pub use solver::Solver;
