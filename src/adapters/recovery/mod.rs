//! Recovery collaborators: analysis, solution generation, implementation,
//! and validation.

pub mod analyzer;
pub mod simulated;
pub mod solver;

pub use analyzer::HeuristicAnalyzer;
pub use simulated::{SimulatedImplementer, SimulatedValidator};
pub use solver::{ScriptedSolver, TemplateSolver};
