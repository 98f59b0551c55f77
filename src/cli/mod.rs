//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use output::progress::{create_progress_bar, create_spinner, ProgressBarExt};
pub use types::{Cli, Commands};

/// Print a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    tracing::error!(error = %format!("{err:#}"), "command failed");
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
