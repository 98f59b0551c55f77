//! Simulated implementer and validator.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ActionOutcome, RecoverySession, Solution};
use crate::domain::ports::{Implementer, Validator};

/// Outcome source shared by the simulated collaborators: scripted outcomes
/// are consumed first, then the fixed default applies.
#[derive(Debug)]
struct Script {
    default_success: bool,
    queued: Mutex<VecDeque<bool>>,
}

impl Script {
    fn new(default_success: bool) -> Self {
        Self {
            default_success,
            queued: Mutex::new(VecDeque::new()),
        }
    }

    fn next(&self) -> bool {
        self.queued
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(self.default_success)
    }

    fn push(&self, outcomes: impl IntoIterator<Item = bool>) {
        if let Ok(mut q) = self.queued.lock() {
            q.extend(outcomes);
        }
    }
}

/// Pretends to apply solutions.
#[derive(Debug)]
pub struct SimulatedImplementer {
    script: Script,
}

impl SimulatedImplementer {
    pub fn new(succeed: bool) -> Self {
        Self {
            script: Script::new(succeed),
        }
    }

    /// Queue outcomes for the next calls.
    pub fn with_script(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.script.push(outcomes);
        self
    }
}

#[async_trait]
impl Implementer for SimulatedImplementer {
    async fn apply(&self, solution: &Solution) -> DomainResult<ActionOutcome> {
        tracing::info!(
            solution_type = %solution.solution_type,
            steps = solution.steps.len(),
            "simulating solution implementation"
        );
        if self.script.next() {
            Ok(ActionOutcome::success())
        } else {
            Ok(ActionOutcome::failure(format!(
                "simulated failure applying {}",
                solution.solution_type
            )))
        }
    }
}

/// Pretends to verify an applied solution.
#[derive(Debug)]
pub struct SimulatedValidator {
    script: Script,
}

impl SimulatedValidator {
    pub fn new(succeed: bool) -> Self {
        Self {
            script: Script::new(succeed),
        }
    }

    pub fn with_script(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.script.push(outcomes);
        self
    }
}

#[async_trait]
impl Validator for SimulatedValidator {
    async fn check(&self, session: &RecoverySession) -> DomainResult<ActionOutcome> {
        if self.script.next() {
            Ok(ActionOutcome::success())
        } else {
            Ok(ActionOutcome::failure(format!(
                "issue at {} still reproduces",
                session.issue.location
            )))
        }
    }
}
