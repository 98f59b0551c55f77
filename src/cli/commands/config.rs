//! `medic config`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::cli::types::ConfigCommands;
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
struct ShowOutput {
    config: Config,
}

impl CommandOutput for ShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    valid: bool,
    error: Option<String>,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        match &self.error {
            None => "Configuration is valid.".to_string(),
            Some(error) => format!("Configuration is invalid: {error}"),
        }
    }
}

/// `loaded` is the result of loading configuration; `validate` reports a
/// load failure instead of propagating it.
pub fn execute(command: ConfigCommands, loaded: Result<Config>, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            output(&ShowOutput { config: loaded? }, json_mode);
            Ok(())
        }
        ConfigCommands::Validate => {
            let out = match loaded {
                Ok(_) => ValidateOutput {
                    valid: true,
                    error: None,
                },
                Err(e) => ValidateOutput {
                    valid: false,
                    error: Some(format!("{e:#}")),
                },
            };
            let valid = out.valid;
            output(&out, json_mode);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
