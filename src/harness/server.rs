//! Server mode: drive a live service with the recorded requests.
//!
//! Used to check that a service still holds up its side of the recorded
//! conversations. Requests go out one at a time through a
//! [`NormalizingTransport`], so subscription ids handed out by the service
//! are mapped back onto the ids the recording uses.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::SessionKey;
use crate::adapters::live;
use crate::adapters::normalizing::NormalizingTransport;
use crate::availability::wait_until_available;
use crate::config::HarnessConfig;
use crate::error::{VectorError, VectorResult};
use crate::ports::{Response, Transport};
use crate::vector::format::{Vector, VectorFile};
use crate::vector::store::VectorStore;

/// Replays recorded requests against a live service.
pub struct ServerReplayer {
    document: VectorFile,
    transport: NormalizingTransport,
}

impl ServerReplayer {
    /// Replay `document` through `live`.
    pub fn new(document: VectorFile, live: Arc<dyn Transport>) -> Self {
        Self { document, transport: NormalizingTransport::new(live) }
    }

    /// Load the document, wait for the configured service and connect.
    ///
    /// # Errors
    ///
    /// Returns a persistence error for a missing document, a config error
    /// without a URL, or an availability timeout.
    pub async fn open(config: &HarnessConfig) -> VectorResult<Self> {
        let document = VectorStore::new(&config.dir).load()?;
        let url = config.require_url()?;
        wait_until_available(url, config.poll_interval, config.setup_timeout).await?;
        Ok(Self::new(document, live::connect(url, config.method_prefix.as_deref())))
    }

    /// Titles of the recorded tests, in recording order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.document.it.keys().map(String::as_str)
    }

    /// Replay the recorded setup requests and return how many were sent.
    /// A document without setup replays nothing.
    ///
    /// # Errors
    ///
    /// Returns a transport error or a protocol mismatch from the replay.
    pub async fn before(&self) -> VectorResult<usize> {
        match &self.document.before {
            Some(vector) => self.replay(&SessionKey::Before, vector).await,
            None => Ok(0),
        }
    }

    /// Replay the requests recorded for `title` and return how many were
    /// sent.
    ///
    /// # Errors
    ///
    /// Returns a protocol mismatch if `title` was never recorded or the
    /// service answers a request with a different outcome, or a transport
    /// error.
    pub async fn it(&self, title: &str) -> VectorResult<usize> {
        let key = SessionKey::Test(title.to_string());
        let vector = key
            .vector_in(&self.document)
            .ok_or_else(|| VectorError::mismatch(format!("no recorded conversation for {key}")))?;
        self.replay(&key, vector).await
    }

    async fn replay(&self, key: &SessionKey, vector: &Vector) -> VectorResult<usize> {
        info!(session = %key, requests = vector.len(), "replaying against service");
        let outcome = self.exchange(key, vector).await;
        // Each session ends its stream, whatever happened during it.
        match self.transport.close().await {
            Ok(()) => outcome,
            Err(e) if outcome.is_ok() => Err(e),
            Err(e) => {
                warn!(session = %key, "closing stream failed: {e}");
                outcome
            }
        }
    }

    async fn exchange(&self, key: &SessionKey, vector: &Vector) -> VectorResult<usize> {
        for (index, pair) in vector.pairs().iter().enumerate() {
            let request = pair.request.clone();
            let method = request.method.clone();
            let response = self.transport.send(vec![request]).await?.pop().ok_or_else(|| {
                VectorError::transport(format!("service sent no response to {method}"))
            })?;

            if response.is_error() != pair.response.is_error() {
                return Err(VectorError::mismatch(format!(
                    "{key} request {index} ({method}): recorded {} but the service answered {}",
                    outcome(&pair.response),
                    outcome(&response)
                )));
            }
            if response.result != pair.response.result {
                debug!(session = %key, index, %method, "result differs from recording");
            }
        }
        Ok(vector.len())
    }
}

fn outcome(response: &Response) -> String {
    match &response.error {
        Some(fault) => format!("error {} ({})", fault.code, fault.message),
        None => "success".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedTransport;
    use crate::ports::{Request, RpcFault};
    use crate::vector::format::Pair;
    use serde_json::json;

    fn pair(id: &str, method: &str, params: serde_json::Value, result: serde_json::Value) -> Pair {
        Pair { request: Request::new(id, method, params), response: Response::ok(id, result) }
    }

    fn subscription_document() -> VectorFile {
        let mut document = VectorFile::default();
        document.it.insert(
            "polls events".into(),
            Vector::from(vec![
                pair("1", "eventSubscribe", json!({"eventId": "Log"}), json!({"subId": "0"})),
                pair("2", "eventPoll", json!({"subId": "0"}), json!({"events": []})),
            ]),
        );
        document
    }

    fn service() -> Arc<ScriptedTransport> {
        Arc::new(ScriptedTransport::new(|request| match request.method.as_str() {
            "eventSubscribe" => Ok(Response::ok(&request.id, json!({"subId": "f00d"}))),
            "eventPoll" if request.params["subId"] == "f00d" => {
                Ok(Response::ok(&request.id, json!({"events": []})))
            }
            _ => Ok(Response::err(
                &request.id,
                RpcFault { code: -32602, message: "unknown subscription".into(), data: None },
            )),
        }))
    }

    #[tokio::test]
    async fn replays_requests_with_live_subscription_ids() {
        let live = service();
        let server = ServerReplayer::new(subscription_document(), live.clone());

        assert_eq!(server.it("polls events").await.unwrap(), 2);
        assert_eq!(live.received()[1].params, json!({"subId": "f00d"}));
        assert_eq!(live.closes(), 1);
    }

    #[tokio::test]
    async fn outcome_change_is_a_mismatch_and_still_closes() {
        let live = Arc::new(ScriptedTransport::new(|request| {
            Ok(Response::err(
                &request.id,
                RpcFault { code: -32000, message: "insufficient funds".into(), data: None },
            ))
        }));
        let server = ServerReplayer::new(subscription_document(), live.clone());

        let err = server.it("polls events").await.unwrap_err();
        assert!(matches!(err, VectorError::ProtocolMismatch(ref m)
            if m.contains("recorded success but the service answered error -32000")));
        assert_eq!(live.received().len(), 1);
        assert_eq!(live.closes(), 1);
    }

    #[tokio::test]
    async fn missing_setup_replays_nothing() {
        let live = service();
        let server = ServerReplayer::new(subscription_document(), live.clone());
        assert_eq!(server.before().await.unwrap(), 0);
        assert_eq!(live.closes(), 0);
        assert_eq!(server.titles().collect::<Vec<_>>(), vec!["polls events"]);
    }

    #[tokio::test]
    async fn unknown_title_is_a_mismatch() {
        let server = ServerReplayer::new(VectorFile::default(), service());
        assert!(matches!(server.it("nope").await, Err(VectorError::ProtocolMismatch(_))));
    }
}
