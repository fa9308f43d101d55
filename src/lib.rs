//! Deterministic record/replay harness for JSON-RPC conversations.
//!
//! A suite runs in one of three modes. Record mode talks to a live service
//! and captures each session's conversation as a normalized vector. Play
//! mode serves those vectors back as a mock so the SDK under test runs with
//! no network. Server mode sends the recorded requests to a live service to
//! check that it still answers them the same way.

pub mod adapters;
pub mod availability;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod harness;
pub mod ports;
pub mod vector;

use clap::error::ErrorKind;
use clap::Parser;

pub use config::{HarnessConfig, Mode};
pub use error::{VectorError, VectorResult};
pub use harness::{Harness, Session};

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub async fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command).await
}
