//! CLI command implementations.

pub mod config;
pub mod heal;
pub mod monitor;
pub mod plan;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::adapters::{
    CommandProbe, HeuristicAnalyzer, SimulatedImplementer, SimulatedValidator, TemplateSolver,
};
use crate::domain::models::{Config, RecoverySession};
use crate::domain::ports::HealthProbe;
use crate::infrastructure::config::ConfigLoader;
use crate::services::{HealthMonitor, RecoveryLoop, SessionPolicy, SessionRunner};

/// Load the explicit config file, or the layered `.medic/` configuration.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Command probes declared in the configuration.
pub fn configured_probes(config: &Config) -> Result<Vec<Arc<dyn HealthProbe>>> {
    config
        .monitor
        .probes
        .iter()
        .map(|probe| {
            CommandProbe::from_config(probe)
                .map(|p| Arc::new(p) as Arc<dyn HealthProbe>)
                .with_context(|| format!("invalid probe '{}'", probe.name))
        })
        .collect()
}

/// Session runner wired with the built-in collaborators.
pub fn session_runner(config: &Config, validation_succeeds: bool) -> SessionRunner {
    SessionRunner::new(
        Arc::new(HeuristicAnalyzer::new()),
        Arc::new(TemplateSolver::new()),
        Arc::new(SimulatedImplementer::new(true)),
        Arc::new(SimulatedValidator::new(validation_succeeds)),
        SessionPolicy::from(&config.recovery),
    )
}

/// Recovery loop with the built-in collaborators and the given probes.
pub fn recovery_loop(config: &Config, probes: Vec<Arc<dyn HealthProbe>>) -> RecoveryLoop {
    let monitor = HealthMonitor::new(probes, config.monitor.clone());
    RecoveryLoop::new(session_runner(config, true), monitor, config.recovery.clone())
}

/// Compact view of a finished session for command output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionBrief {
    pub session_id: uuid::Uuid,
    pub issue: String,
    pub phase: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub solution: Option<String>,
}

impl From<&RecoverySession> for SessionBrief {
    fn from(session: &RecoverySession) -> Self {
        Self {
            session_id: session.id,
            issue: session.issue.description.clone(),
            phase: session.phase.to_string(),
            success: session.success,
            failure_reason: session.failure_reason.as_ref().map(ToString::to_string),
            solution: session
                .applied_solution
                .as_ref()
                .map(|s| format!("{}: {}", s.solution_type, s.description)),
        }
    }
}

impl SessionBrief {
    pub fn line(&self) -> String {
        let outcome = if self.success {
            "healed".to_string()
        } else {
            self.failure_reason.clone().unwrap_or_else(|| self.phase.clone())
        };
        format!("  {} [{}] {}", &self.session_id.to_string()[..8], outcome, self.issue)
    }
}
