//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "medic")]
#[command(about = "Medic - dependency-aware scheduler with autonomous recovery", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .medic/
    #[arg(short, long, global = true, env = "MEDIC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and display the phased execution plan of a workflow file
    Plan(PlanArgs),

    /// Execute a workflow with simulated capability handlers
    Run(RunArgs),

    /// Run one recovery session for a described issue
    Heal(HealArgs),

    /// Monitor a project with command probes and the recovery loop attached
    Monitor(MonitorArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Workflow YAML file
    pub file: PathBuf,

    /// Treat dependency cycles as an error
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow YAML file
    pub file: PathBuf,

    /// Report failed items to the recovery loop
    #[arg(long)]
    pub recover: bool,

    /// Project id used for recovery sessions
    #[arg(short, long, default_value = "default")]
    pub project: String,

    /// Ceiling on concurrent items per phase
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Simulated milliseconds per estimated second of work
    #[arg(long, default_value = "10")]
    pub time_scale_ms: u64,
}

#[derive(Args, Debug)]
pub struct HealArgs {
    /// Issue description
    pub description: String,

    /// Project id
    #[arg(short, long, default_value = "default")]
    pub project: String,

    /// Issue type (runtime, dependency, config, ...)
    #[arg(short = 't', long, default_value = "runtime")]
    pub issue_type: String,

    /// Severity (1-10)
    #[arg(short, long, default_value = "8")]
    pub severity: u8,

    /// Where the issue was observed
    #[arg(short, long, default_value = "unknown")]
    pub location: String,

    /// Raw error text
    #[arg(short, long)]
    pub error: Option<String>,

    /// Override the auto-apply threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Never auto-apply solutions
    #[arg(long)]
    pub no_auto_apply: bool,

    /// Make the simulated validation fail
    #[arg(long)]
    pub fail_validation: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Project id
    #[arg(default_value = "default")]
    pub project: String,

    /// Number of health checks before stopping
    #[arg(short = 'n', long, default_value = "3")]
    pub cycles: u32,

    /// Seconds between checks (defaults to monitor.interval_secs)
    #[arg(short, long)]
    pub interval_secs: Option<u64>,

    /// Extra shell command to use as a probe (repeatable)
    #[arg(long = "probe")]
    pub probes: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}
