//! CLI argument definitions using clap
//!
//! Commands:
//! - libris serve --config <path>
//! - libris check-config --config <path>
//! - libris report --config <path>
//! - libris reconcile --config <path>
//! - libris issue-token --config <path> --role <role>

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::auth::Role;

/// Libris - library lending service
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Load and validate the configuration, then exit
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Print the lending report computed from the data file
    Report {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Recompute availability counters in the data file from open loans
    Reconcile {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,
    },

    /// Sign a bearer token for local testing
    IssueToken {
        /// Path to configuration file
        #[arg(long, default_value = "./libris.json")]
        config: PathBuf,

        /// User id; a random one when omitted
        #[arg(long)]
        user: Option<Uuid>,

        /// Display name
        #[arg(long, default_value = "")]
        name: String,

        /// customer, librarian or admin
        #[arg(long, default_value = "customer")]
        role: Role,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
