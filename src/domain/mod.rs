//! Domain layer for the medic scheduling and recovery engine
//!
//! This module contains core models, port traits, and domain errors.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
