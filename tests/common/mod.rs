//! Common test utilities for integration tests

use std::sync::Arc;

use medic::adapters::{
    HeuristicAnalyzer, ScriptedSolver, SimulatedHandler, SimulatedImplementer, SimulatedValidator,
    TemplateSolver,
};
use medic::domain::models::{Solution, SolutionType};
use medic::services::{HandlerRegistry, SessionPolicy, SessionRunner};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Registry with a simulated handler for every capability.
#[allow(dead_code)]
pub fn simulated_registry() -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for handler in SimulatedHandler::all() {
        registry.register(Arc::new(handler));
    }
    Arc::new(registry)
}

/// Runner with the heuristic analyzer and template solver.
#[allow(dead_code)]
pub fn template_runner(validation_succeeds: bool) -> SessionRunner {
    SessionRunner::new(
        Arc::new(HeuristicAnalyzer::new()),
        Arc::new(TemplateSolver::new()),
        Arc::new(SimulatedImplementer::new(true)),
        Arc::new(SimulatedValidator::new(validation_succeeds)),
        SessionPolicy {
            auto_apply_enabled: true,
            auto_apply_threshold: 0.3,
        },
    )
}

/// Runner whose solver always proposes exactly one solution.
#[allow(dead_code)]
pub fn scripted_runner(confidence: f64, threshold: f64) -> SessionRunner {
    SessionRunner::new(
        Arc::new(HeuristicAnalyzer::new()),
        Arc::new(ScriptedSolver::new(vec![Solution::new(
            SolutionType::Restart,
            "restart the worker",
            confidence,
        )])),
        Arc::new(SimulatedImplementer::new(true)),
        Arc::new(SimulatedValidator::new(true)),
        SessionPolicy {
            auto_apply_enabled: true,
            auto_apply_threshold: threshold,
        },
    )
}
