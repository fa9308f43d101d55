//! Reachability probes consumed by the availability poller.

use reqwest::Client;
use tokio_tungstenite::connect_async;
use tracing::debug;

use crate::config::Protocol;
use crate::error::{VectorError, VectorResult};

/// Succeeds once a WebSocket handshake with `url` completes. The connection
/// is closed straight away.
///
/// # Errors
///
/// Returns a transport failure if the handshake cannot be completed.
pub async fn websocket_handshake(url: &str) -> VectorResult<()> {
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| VectorError::transport(format!("handshake with {url} failed: {e}")))?;
    if let Err(e) = ws.close(None).await {
        debug!(%url, "closing probe connection failed: {e}");
    }
    Ok(())
}

/// Succeeds once `url` answers an HTTP GET with any status. Only
/// connection-level failures count as unavailable.
///
/// # Errors
///
/// Returns a transport failure if no HTTP answer was received.
pub async fn http_health(client: &Client, url: &str) -> VectorResult<()> {
    client
        .get(url)
        .send()
        .await
        .map(|response| debug!(%url, status = response.status().as_u16(), "health probe answered"))
        .map_err(|e| VectorError::transport(format!("health check of {url} failed: {e}")))
}

/// Probe `url` over the channel its scheme selects.
///
/// # Errors
///
/// Returns the failure of the selected probe.
pub async fn probe(client: &Client, url: &str) -> VectorResult<()> {
    match Protocol::from_url(url) {
        Protocol::WebSocket => websocket_handshake(url).await,
        Protocol::Http => http_health(client, url).await,
    }
}
