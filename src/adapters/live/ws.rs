//! Live transport speaking JSON-RPC over a WebSocket stream.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{decode, is_reply, WireRequest};
use crate::error::{VectorError, VectorResult};
use crate::ports::{Request, Response, Transport, TransportFuture};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens the connection lazily on the first send and keeps it until
/// [`Transport::close`] ends the stream. A failed exchange drops the
/// connection so the next send reconnects.
pub struct LiveWsTransport {
    url: String,
    method_prefix: Option<String>,
    stream: Mutex<Option<WsStream>>,
}

impl LiveWsTransport {
    /// Creates a transport for `url` without connecting.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), method_prefix: None, stream: Mutex::new(None) }
    }

    /// Prefix every method name (e.g. `"burrow."`) before it goes on the wire.
    #[must_use]
    pub fn with_method_prefix(mut self, prefix: Option<&str>) -> Self {
        self.method_prefix = prefix.map(ToString::to_string);
        self
    }

    async fn exchange(&self, ws: &mut WsStream, request: &Request) -> VectorResult<Response> {
        let text = WireRequest::new(request, self.method_prefix.as_deref()).to_text()?;
        ws.send(Message::Text(text))
            .await
            .map_err(|e| VectorError::transport(format!("send to {} failed: {e}", self.url)))?;

        loop {
            let body = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Binary(bytes))) => String::from_utf8(bytes).map_err(|e| {
                    VectorError::transport(format!("binary frame from {} is not UTF-8: {e}", self.url))
                })?,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(VectorError::transport(format!(
                        "{} closed the stream before answering {}",
                        self.url, request.method
                    )));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(VectorError::transport(format!("read from {} failed: {e}", self.url)));
                }
            };
            if !is_reply(&body) {
                debug!(url = %self.url, "skipping notification while awaiting {}", request.id);
                continue;
            }
            let response = decode(&body, request)?;
            if response.id == request.id {
                return Ok(response);
            }
            debug!(url = %self.url, stale = %response.id, "skipping reply while awaiting {}", request.id);
        }
    }
}

/// Drops the connection unless every exchange it covers settled, so a reply
/// left behind by a failed or cancelled send is never read by the next one.
struct InFlight<'a> {
    slot: &'a mut Option<WsStream>,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled && self.slot.take().is_some() {
            debug!("dropping websocket connection with an unsettled exchange");
        }
    }
}

impl Transport for LiveWsTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut guard = self.stream.lock().await;
            if guard.is_none() {
                let (ws, _) = connect_async(self.url.as_str()).await.map_err(|e| {
                    VectorError::transport(format!("connect to {} failed: {e}", self.url))
                })?;
                *guard = Some(ws);
            }
            let mut in_flight = InFlight { slot: &mut *guard, settled: false };
            let ws = in_flight
                .slot
                .as_mut()
                .ok_or_else(|| VectorError::transport("websocket connection unavailable"))?;

            let mut responses = Vec::with_capacity(requests.len());
            for request in &requests {
                responses.push(self.exchange(ws, request).await?);
            }
            in_flight.settled = true;
            Ok(responses)
        })
    }

    fn close(&self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let stream = self.stream.lock().await.take();
            if let Some(mut ws) = stream {
                ws.close(None)
                    .await
                    .map_err(|e| VectorError::transport(format!("closing {} failed: {e}", self.url)))?;
            }
            Ok(())
        })
    }
}
