//! Command-line interface for qrstash.
//!
//! This module provides the CLI structure for the `qrstash` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, ConfigCommand, ListCommand, ShowCommand, StatusCommand, TabsCommand,
};

/// qrstash - Keep photographed QR codes, sorted into categories
///
/// Saves QR code images locally, files them under user-defined category
/// tabs, and decodes them again on demand.
#[derive(Debug, Parser)]
#[command(name = "qrstash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage category tabs
    #[command(subcommand)]
    Tabs(TabsCommand),

    /// Save a QR code image
    Add(AddCommand),

    /// List saved QR codes
    List(ListCommand),

    /// Decode and show a saved QR code
    Show(ShowCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "qrstash");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(3, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tabs_add() {
        let cli = Cli::try_parse_from(["qrstash", "tabs", "add", "Work"]).unwrap();
        match cli.command {
            Command::Tabs(TabsCommand::Add { label }) => assert_eq!(label, "Work"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tabs_list() {
        let cli = Cli::try_parse_from(["qrstash", "tabs", "list", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tabs(TabsCommand::List { json: true })
        ));
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::try_parse_from(["qrstash", "add", "ticket.png"]).unwrap();
        let Command::Add(add) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(add.image, PathBuf::from("ticket.png"));
        assert_eq!(add.category, "All");
        assert_eq!(add.title, "");
        assert!(!add.raw);
    }

    #[test]
    fn test_parse_add_with_options() {
        let args = [
            "qrstash", "add", "ticket.png", "-C", "Shop", "--title", "Costco", "--raw",
        ];
        let Command::Add(add) = Cli::try_parse_from(args).unwrap().command else {
            panic!("expected add");
        };
        assert_eq!(add.category, "Shop");
        assert_eq!(add.title, "Costco");
        assert!(add.raw);
    }

    #[test]
    fn test_parse_list_category() {
        let cli = Cli::try_parse_from(["qrstash", "list", "--category", "Gas"]).unwrap();
        let Command::List(list) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(list.category, "Gas");
        assert!(!list.json);
    }

    #[test]
    fn test_parse_show() {
        let cli = Cli::try_parse_from(["qrstash", "show", "2", "--json"]).unwrap();
        let Command::Show(show) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(show.index, 2);
        assert!(show.json);
    }

    #[test]
    fn test_parse_show_requires_number() {
        assert!(Cli::try_parse_from(["qrstash", "show", "first"]).is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let args = ["qrstash", "config", "validate", "--file", "/tmp/q.toml"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = ["qrstash", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qrstash", "list", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);

        let cli = Cli::try_parse_from(["qrstash", "status", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
