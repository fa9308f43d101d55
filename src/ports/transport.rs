//! Transport port: ordered requests in, ordered responses out.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{VectorError, VectorResult};

/// Boxed future type alias used by [`Transport`] to keep the trait dyn-compatible.
pub type TransportFuture<'a, T = Vec<Response>> =
    Pin<Box<dyn Future<Output = VectorResult<T>> + Send + 'a>>;

/// A single outbound RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Identifier, unique within one conversation.
    pub id: String,
    /// Method name.
    pub method: String,
    /// Structured parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Creates a request.
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self { id: id.into(), method: method.into(), params }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcFault {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The inbound answer to a [`Request`]: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this answers.
    pub id: String,
    /// Result value on success. A literal `null` result is kept as `Some(Value::Null)`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcFault>,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self { id: id.into(), result: Some(result), error: None }
    }

    /// Creates a failed response.
    pub fn err(id: impl Into<String>, fault: RpcFault) -> Self {
        Self { id: id.into(), result: None, error: Some(fault) }
    }

    /// Returns `true` when the response carries an error object.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Checks the result/error exclusivity of a response received off the wire.
    ///
    /// # Errors
    ///
    /// Returns a transport failure when both or neither of `result` and
    /// `error` are present.
    pub fn validated(self) -> VectorResult<Self> {
        match (&self.result, &self.error) {
            (Some(_), Some(_)) => Err(VectorError::transport(format!(
                "response {} carries both a result and an error",
                self.id
            ))),
            (None, None) => Err(VectorError::transport(format!(
                "response {} carries neither a result nor an error",
                self.id
            ))),
            _ => Ok(self),
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Turns an ordered batch of requests into the matching ordered batch of
/// responses.
///
/// Responses are paired with requests by position. Implementations must
/// return exactly one response per request, in request order.
pub trait Transport: Send + Sync {
    /// Sends the requests and waits for their responses.
    ///
    /// # Errors
    ///
    /// Returns an error if the conversation cannot be carried out (network
    /// failure, replay mismatch, ...). Service-level errors are ordinary
    /// responses with [`Response::error`] set.
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_>;

    /// Signals end-of-stream so a streaming connection can terminate cleanly.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying connection fails to shut down.
    fn close(&self) -> TransportFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
