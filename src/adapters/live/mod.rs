//! Live adapters talking JSON-RPC to a running service.

pub mod http;
pub mod probe;
pub mod ws;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::Protocol;
use crate::error::{VectorError, VectorResult};
use crate::ports::{Request, Response, Transport};

pub use http::LiveHttpTransport;
pub use ws::LiveWsTransport;

/// Build the live transport matching the URL scheme.
#[must_use]
pub fn connect(url: &str, method_prefix: Option<&str>) -> Arc<dyn Transport> {
    match Protocol::from_url(url) {
        Protocol::WebSocket => {
            Arc::new(LiveWsTransport::new(url).with_method_prefix(method_prefix))
        }
        Protocol::Http => Arc::new(LiveHttpTransport::new(url).with_method_prefix(method_prefix)),
    }
}

/// JSON-RPC 2.0 request envelope.
#[derive(Serialize)]
struct WireRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: String,
    params: &'a Value,
}

impl<'a> WireRequest<'a> {
    fn new(request: &'a Request, method_prefix: Option<&str>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: &request.id,
            method: format!("{}{}", method_prefix.unwrap_or_default(), request.method),
            params: &request.params,
        }
    }

    fn to_text(&self) -> VectorResult<String> {
        serde_json::to_string(self)
            .map_err(|e| VectorError::transport(format!("failed to encode request {}: {e}", self.id)))
    }
}

/// Decode a JSON-RPC response body, coercing numeric ids to strings and
/// falling back to the request id when the service omits it.
fn decode(body: &str, request: &Request) -> VectorResult<Response> {
    let mut value: Value = serde_json::from_str(body).map_err(|e| {
        VectorError::transport(format!("response to {} is not JSON: {e}", request.method))
    })?;
    let Some(object) = value.as_object_mut() else {
        return Err(VectorError::transport(format!(
            "response to {} is not a JSON object",
            request.method
        )));
    };
    let id = match object.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => request.id.clone(),
    };
    object.insert("id".into(), Value::String(id));
    object.remove("jsonrpc");

    let response: Response = serde_json::from_value(value).map_err(|e| {
        VectorError::transport(format!("malformed response to {}: {e}", request.method))
    })?;
    response.validated()
}

/// Whether a streamed message is a reply rather than a notification.
fn is_reply(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.as_object().map(|o| o.contains_key("result") || o.contains_key("error")))
        .unwrap_or(false)
}
