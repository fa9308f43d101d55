//! Live transport posting JSON-RPC requests over HTTP.

use reqwest::Client;
use tracing::debug;

use super::{decode, WireRequest};
use crate::error::{VectorError, VectorResult};
use crate::ports::{Request, Response, Transport, TransportFuture};

/// Sends each request as its own POST, in order, and pairs the answers
/// positionally.
pub struct LiveHttpTransport {
    client: Client,
    url: String,
    method_prefix: Option<String>,
}

impl LiveHttpTransport {
    /// Creates a transport posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: Client::new(), url: url.into(), method_prefix: None }
    }

    /// Prefix every method name (e.g. `"burrow."`) before it goes on the wire.
    #[must_use]
    pub fn with_method_prefix(mut self, prefix: Option<&str>) -> Self {
        self.method_prefix = prefix.map(ToString::to_string);
        self
    }

    async fn post(&self, request: &Request) -> VectorResult<Response> {
        let body = WireRequest::new(request, self.method_prefix.as_deref()).to_text()?;
        debug!(url = %self.url, method = %request.method, id = %request.id, "posting request");

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| VectorError::transport(format!("request to {} failed: {e}", self.url)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            VectorError::transport(format!("failed to read response from {}: {e}", self.url))
        })?;

        decode(&text, request).map_err(|e| {
            if status.is_success() {
                e
            } else {
                VectorError::transport(format!("{} answered {}: {text}", self.url, status.as_u16()))
            }
        })
    }
}

impl Transport for LiveHttpTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        Box::pin(async move {
            let mut responses = Vec::with_capacity(requests.len());
            for request in &requests {
                responses.push(self.post(request).await?);
            }
            Ok(responses)
        })
    }
}
