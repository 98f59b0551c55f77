//! Medic - dependency-aware work scheduling with autonomous recovery
//!
//! Medic turns a set of work items with dependencies into phases of
//! parallel execution, runs them through capability handlers with bounded
//! concurrency, watches project health through pluggable probes, and drives
//! detected problems through a recovery pipeline
//! (detect, analyze, solve, implement, validate).
//!
//! # Architecture
//!
//! The crate follows a Hexagonal Architecture:
//!
//! - **Domain Layer** (`domain`): models, port traits and domain errors
//! - **Service Layer** (`services`): graph building, phase execution, health
//!   monitoring and the recovery loop
//! - **Adapters** (`adapters`): concrete handlers, probes, recovery
//!   collaborators and the tool gateway
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use medic::services::GraphBuilder;
//! use medic::domain::models::{Capability, WorkItem};
//!
//! let items = vec![
//!     WorkItem::new("api", Capability::Backend),
//!     WorkItem::new("ui", Capability::Frontend).with_dependencies(["api"]),
//! ];
//! let plan = GraphBuilder::new().build(items)?;
//! assert_eq!(plan.phases.len(), 2);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::models::{
    Capability, Config, ExecutionPlan, HealthIssue, HealthReport, IssueType, RecoverySession,
    WorkItem,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{GraphBuilder, HealthMonitor, PhaseExecutor, RecoveryLoop};
