//! Command dispatch and handlers.

pub mod server;
pub mod show;
pub mod wait;

use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub async fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Show { dir, title } => show::run(dir, title.as_deref()),
        Command::Wait { url, interval_ms, timeout_secs } => {
            wait::run(url, *interval_ms, *timeout_secs).await
        }
        Command::Server { dir, url, method_prefix, tests } => {
            server::run(dir, url.as_deref(), method_prefix.as_deref(), tests).await
        }
    }
}
