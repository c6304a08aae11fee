//! CLI module for libris
//!
//! Provides command-line interface for:
//! - serve: Run the HTTP API
//! - check-config: Validate a configuration file
//! - report: Offline lending report
//! - reconcile: Offline availability repair
//! - issue-token: Developer bearer tokens

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, issue_token, open_store, reconcile, report, run, run_command, save_store, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_json, write_json_to};
