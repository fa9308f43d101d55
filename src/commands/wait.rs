//! `rpc-vector wait` command.

use std::time::Duration;

use crate::availability::wait_until_available;

/// Execute the `wait` command: poll `url` until it answers.
///
/// # Errors
///
/// Returns an error string if the service stays unreachable for
/// `timeout_secs`.
pub async fn run(url: &str, interval_ms: u64, timeout_secs: u64) -> Result<(), String> {
    wait_until_available(url, Duration::from_millis(interval_ms), Duration::from_secs(timeout_secs))
        .await
        .map_err(|e| e.to_string())?;
    println!("{url} is available");
    Ok(())
}
