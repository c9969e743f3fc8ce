//! Command line interface definition

use clap::{Parser, Subcommand};
use npmirror_types::ColorChoice;
use std::path::PathBuf;

/// npmirror - mirror newly published npm packages into offline archives
#[derive(Parser)]
#[command(name = "npmirror")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror newly published npm packages into offline archives")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Write JSON lines instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the mirror once now
    Run,

    /// Run on the cron schedule until interrupted
    Daemon {
        /// Wait for the first trigger instead of running immediately
        #[arg(long)]
        no_run_on_start: bool,

        /// Six-field cron expression (sec min hour day month weekday)
        #[arg(long, value_name = "EXPR")]
        cron: Option<String>,
    },

    /// Start tracking packages; the next run mirrors their latest version
    Track {
        /// Package names, scoped names included
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Stop tracking packages
    #[command(alias = "rm")]
    Untrack {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List tracked packages and their known versions
    #[command(alias = "ls")]
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_daemon_flags() {
        let cli = Cli::try_parse_from([
            "npmirror",
            "--color",
            "never",
            "daemon",
            "--no-run-on-start",
            "--cron",
            "0 30 2 * * *",
        ])
        .unwrap();
        assert_eq!(cli.global.color, Some(ColorChoice::Never));
        match cli.command {
            Commands::Daemon {
                no_run_on_start,
                cron,
            } => {
                assert!(no_run_on_start);
                assert_eq!(cron.as_deref(), Some("0 30 2 * * *"));
            }
            _ => panic!("expected daemon"),
        }
    }

    #[test]
    fn test_track_requires_names() {
        assert!(Cli::try_parse_from(["npmirror", "track"]).is_err());
        let cli = Cli::try_parse_from(["npmirror", "track", "left-pad", "@types/node"]).unwrap();
        match cli.command {
            Commands::Track { names } => assert_eq!(names, ["left-pad", "@types/node"]),
            _ => panic!("expected track"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["npmirror", "run", "--json", "--debug"]).unwrap();
        assert!(cli.global.json);
        assert!(cli.global.debug);
        assert!(matches!(cli.command, Commands::Run));
    }
}
