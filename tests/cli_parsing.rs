use clap::Parser;
use medic::cli::types::ConfigCommands;
use medic::cli::{Cli, Commands};

#[test]
fn test_parse_plan() {
    let cli = Cli::try_parse_from(["medic", "plan", "release.yaml", "--strict", "--json"]).unwrap();
    assert!(cli.json);
    match cli.command {
        Commands::Plan(args) => {
            assert_eq!(args.file.to_str(), Some("release.yaml"));
            assert!(args.strict);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_run_defaults() {
    let cli = Cli::try_parse_from(["medic", "run", "release.yaml"]).unwrap();
    match cli.command {
        Commands::Run(args) => {
            assert!(!args.recover);
            assert_eq!(args.project, "default");
            assert_eq!(args.max_concurrency, None);
            assert_eq!(args.time_scale_ms, 10);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_heal() {
    let cli = Cli::try_parse_from([
        "medic",
        "heal",
        "worker keeps crashing",
        "-t",
        "dependency",
        "-s",
        "9",
        "--error",
        "Cannot find module 'left-pad'",
        "--threshold",
        "0.6",
    ])
    .unwrap();

    match cli.command {
        Commands::Heal(args) => {
            assert_eq!(args.description, "worker keeps crashing");
            assert_eq!(args.issue_type, "dependency");
            assert_eq!(args.severity, 9);
            assert_eq!(args.error.as_deref(), Some("Cannot find module 'left-pad'"));
            assert_eq!(args.threshold, Some(0.6));
            assert!(!args.no_auto_apply);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_monitor_with_probes() {
    let cli = Cli::try_parse_from([
        "medic",
        "-v",
        "monitor",
        "shop",
        "-n",
        "5",
        "--probe",
        "cargo check",
        "--probe",
        "npm test",
    ])
    .unwrap();
    assert!(cli.verbose);
    match cli.command {
        Commands::Monitor(args) => {
            assert_eq!(args.project, "shop");
            assert_eq!(args.cycles, 5);
            assert_eq!(args.probes, vec!["cargo check", "npm test"]);
        }
        _ => panic!("Wrong command"),
    }
}

#[test]
fn test_parse_config_validate() {
    let cli = Cli::try_parse_from(["medic", "config", "validate", "-c", "medic.yaml"]).unwrap();
    assert_eq!(cli.config.as_deref().and_then(|p| p.to_str()), Some("medic.yaml"));
    assert!(matches!(cli.command, Commands::Config(ConfigCommands::Validate)));
}

#[test]
fn test_missing_workflow_file_is_rejected() {
    assert!(Cli::try_parse_from(["medic", "run"]).is_err());
}
