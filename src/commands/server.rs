//! `rpc-vector server` command.

use std::path::Path;

use crate::config::{HarnessConfig, Mode};
use crate::harness::ServerReplayer;

/// Execute the `server` command.
///
/// Replays the recorded setup, then each selected test, against the live
/// service at `url`. Stops at the first failing session.
///
/// # Errors
///
/// Returns an error string for a missing URL or document, an unreachable
/// service, or the first session whose replay fails.
pub async fn run(
    dir: &Path,
    url: Option<&str>,
    method_prefix: Option<&str>,
    tests: &[String],
) -> Result<(), String> {
    let mut config = HarnessConfig::new(Mode::Server, dir);
    config.url = url.map(str::to_string);
    config.method_prefix = method_prefix.map(str::to_string);

    let server = ServerReplayer::open(&config).await.map_err(|e| e.to_string())?;
    let titles: Vec<String> = if tests.is_empty() {
        server.titles().map(str::to_string).collect()
    } else {
        tests.to_vec()
    };

    let sent = server.before().await.map_err(|e| format!("before: {e}"))?;
    if sent > 0 {
        println!("before: {sent} request(s) ok");
    }
    for title in &titles {
        let sent = server.it(title).await.map_err(|e| format!("{title}: {e}"))?;
        println!("{title}: {sent} request(s) ok");
    }
    println!("Replayed {} test(s) against {}", titles.len(), url.unwrap_or_default());
    Ok(())
}
