//! npmirror - scheduled npm registry mirror
//!
//! Wires configuration, the registry client, the tracked-record database and
//! the run coordinator together, and renders the event stream on the
//! terminal.

mod cli;
mod display;
mod error;
mod events;
mod logging;
mod setup;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use crate::setup::MirrorSetup;
use clap::Parser;
use npmirror_config::Config;
use npmirror_events::{EventReceiver, EventSender};
use npmirror_ops::{RunCoordinator, RunOutcome, Scheduler};
use npmirror_store::TrackedStore;
use npmirror_types::ColorChoice;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};

/// Filter used when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "warn,npmirror=info";
/// Filter used for the debug log file when `RUST_LOG` is unset
const DEBUG_FILTER: &str = "info,npmirror=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    // Configuration decides where logs go, so it is loaded first
    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    init_tracing(json_mode, cli.global.debug, &config.log_dir());

    if let Err(e) = run(cli, config).await {
        error!("Application error: {}", e);
        // Run failures were already drawn by the event handler
        if !json_mode && !matches!(e, CliError::Run(_)) {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Load configuration with precedence file, then environment, then flags
async fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global, &cli.command);
    config.validate()?;
    Ok(config)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs, command: &Commands) {
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Commands::Daemon {
        no_run_on_start,
        cron,
    } = command
    {
        if let Some(expression) = cron {
            config.schedule.cron.clone_from(expression);
        }
        if *no_run_on_start {
            config.schedule.run_on_start = false;
        }
    }
}

/// Main application logic
async fn run(cli: Cli, config: Config) -> Result<(), CliError> {
    info!("Starting npmirror v{}", env!("CARGO_PKG_VERSION"));

    let (event_sender, event_receiver) = npmirror_events::channel();

    let color = config.general.color;
    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, cli.global.json);
    let renderer = OutputRenderer::new(cli.global.json, color);
    let setup = MirrorSetup::new(config);

    let result = execute_command_with_events(
        cli.command,
        &setup,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await;
    event_handler.finish();

    renderer.render(&result?)?;
    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    setup: &MirrorSetup,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, setup, event_sender));

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                if let Some(event) = event {
                    event_handler.handle_event(event);
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    setup: &MirrorSetup,
    tx: EventSender,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Run => {
            let ctx = setup.build_context(tx).await?;
            match RunCoordinator::new(Arc::new(ctx)).run_guarded().await {
                RunOutcome::Completed(report) => Ok(CommandOutput::Run(report)),
                RunOutcome::Failed(failure) => Err(failure.into()),
            }
        }

        Commands::Daemon { .. } => {
            let schedule = setup.config().cron_schedule()?;
            let run_on_start = setup.config().schedule.run_on_start;
            let ctx = setup.build_context(tx).await?;
            let scheduler =
                Scheduler::new(RunCoordinator::new(Arc::new(ctx)), schedule, run_on_start);

            let (stop, shutdown) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("interrupt received, stopping after the active run");
                        let _ = stop.send(true);
                    }
                    Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
                }
            });

            let runs = scheduler.run(shutdown).await?;
            Ok(CommandOutput::Daemon { runs })
        }

        Commands::Track { names } => {
            let store = setup.open_store().await?;
            let mut changed = Vec::new();
            let mut unchanged = Vec::new();
            for name in names {
                validate_package_name(&name)?;
                if store.track(&name).await? {
                    changed.push(name);
                } else {
                    unchanged.push(name);
                }
            }
            Ok(CommandOutput::TrackingChanged {
                action: "Tracking",
                changed,
                unchanged,
            })
        }

        Commands::Untrack { names } => {
            let store = setup.open_store().await?;
            let mut changed = Vec::new();
            let mut unchanged = Vec::new();
            for name in names {
                if store.untrack(&name).await? {
                    changed.push(name);
                } else {
                    unchanged.push(name);
                }
            }
            Ok(CommandOutput::TrackingChanged {
                action: "Untracked",
                changed,
                unchanged,
            })
        }

        Commands::List => {
            let store = setup.open_store().await?;
            Ok(CommandOutput::Tracked(store.find_all().await?))
        }
    }
}

/// Reject names the registry can never serve
fn validate_package_name(name: &str) -> Result<(), CliError> {
    let invalid = |reason: &str| CliError::InvalidArguments(format!("'{name}' {reason}"));
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(invalid("is not a package name"));
    }
    if let Some(scoped) = name.strip_prefix('@') {
        match scoped.split_once('/') {
            Some((scope, pkg)) if !scope.is_empty() && !pkg.is_empty() && !pkg.contains('/') => {}
            _ => return Err(invalid("must look like @scope/name")),
        }
    } else if name.contains('/') {
        return Err(invalid("contains '/' but has no @scope"));
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool, log_dir: &Path) {
    let filter = |default: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
    };

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }
        let log_file = log_dir.join(format!(
            "npmirror-{}.log",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(filter(DEBUG_FILTER))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => eprintln!("Warning: Failed to create log file: {e}"),
        }
    }

    if json_mode {
        // JSON mode: one JSON object per line on stderr
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter(DEFAULT_FILTER))
            .init();
    } else {
        // Events are drawn by the handler, so their records stay off the terminal
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter(format!("{DEFAULT_FILTER},npmirror::events=off").as_str()))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_schedule() {
        let cli = Cli::try_parse_from([
            "npmirror",
            "--color",
            "always",
            "daemon",
            "--no-run-on-start",
            "--cron",
            "0 15 3 * * *",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_cli_config(&mut config, &cli.global, &cli.command);
        assert_eq!(config.general.color, ColorChoice::Always);
        assert_eq!(config.schedule.cron, "0 15 3 * * *");
        assert!(!config.schedule.run_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_leaves_schedule_alone() {
        let cli = Cli::try_parse_from(["npmirror", "run"]).unwrap();
        let mut config = Config::default();
        apply_cli_config(&mut config, &cli.global, &cli.command);
        assert_eq!(config.schedule.cron, Config::default().schedule.cron);
        assert!(config.schedule.run_on_start);
    }

    #[test]
    fn test_package_name_validation() {
        for name in ["left-pad", "@types/node", "lodash.merge"] {
            assert!(validate_package_name(name).is_ok(), "{name}");
        }
        for name in ["", "two words", "@types", "@/node", "a/b", "@scope/a/b"] {
            assert!(validate_package_name(name).is_err(), "{name}");
        }
    }

    #[tokio::test]
    async fn test_track_then_list() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths.cache_dir = Some(temp.path().join("cache"));
        let setup = MirrorSetup::new(config);
        let (tx, _rx) = npmirror_events::channel();

        let tracked = execute_command(
            Commands::Track {
                names: vec!["chalk".to_string(), "chalk".to_string()],
            },
            &setup,
            tx.clone(),
        )
        .await
        .unwrap();
        assert!(matches!(
            tracked,
            CommandOutput::TrackingChanged { ref changed, ref unchanged, .. }
                if changed == &["chalk"] && unchanged == &["chalk"]
        ));

        let listed = execute_command(Commands::List, &setup, tx).await.unwrap();
        match listed {
            CommandOutput::Tracked(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].name, "chalk");
                assert!(records[0].versions.is_empty());
            }
            other => panic!("unexpected output {other:?}"),
        }
    }
}
