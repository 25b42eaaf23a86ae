use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tally_core::{Amount, Direction};

/// CLI surface definition. With no subcommand the interactive menu starts.
#[derive(Parser, Debug)]
#[command(
    name = "tally",
    about = "Encrypted personal finance ledger",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Directory holding the key and data files (overrides config).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Optional subcommand; defaults to the interactive shell when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the interactive menu (choose 5 to save and exit).
    Shell,
    /// Print the balance overview.
    Balance,
    /// Print spent and received transactions.
    History,
    /// Record a spent or received transaction and save.
    Add {
        /// `spent` or `received`.
        direction: Direction,
        /// Positive amount, e.g. 12.50.
        amount: Amount,
        /// Account category (B, D, P, or a new one).
        #[arg(short, long)]
        account: String,
        /// Short description.
        #[arg(short, long, default_value = "")]
        info: String,
        /// Personal note.
        #[arg(short, long, default_value = "")]
        note: String,
    },
    /// Move money between two existing accounts and save.
    Transfer {
        from: String,
        to: String,
        amount: Amount,
    },
    /// Verify that the key and data files can be read.
    Check,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
