//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::category::ALL;

/// Category tab commands.
#[derive(Debug, Subcommand)]
pub enum TabsCommand {
    /// List the category tabs in display order
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add a category tab
    Add {
        /// Label of the new tab (trimmed, at most 12 characters)
        label: String,
    },

    /// Remove a category tab (saved QR codes are kept)
    Remove {
        /// Label of the tab to remove
        label: String,
    },
}

/// Add command arguments.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Image file containing the QR code
    pub image: PathBuf,

    /// Category to file the QR code under
    #[arg(short = 'C', long, default_value = ALL)]
    pub category: String,

    /// Title shown in the list (at most 20 characters)
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Store the file as-is instead of re-encoding it as JPEG
    #[arg(long)]
    pub raw: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only show QR codes in this category
    #[arg(short = 'C', long, default_value = ALL)]
    pub category: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Position of the QR code in the list (starting at 1)
    pub index: usize,

    /// Category the position refers to
    #[arg(short = 'C', long, default_value = ALL)]
    pub category: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
