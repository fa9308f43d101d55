//! Recording adapter for the `Transport` port.

use std::sync::{Arc, Mutex};

use crate::error::VectorError;
use crate::ports::{Request, Transport, TransportFuture};
use crate::vector::format::Pair;
use crate::vector::normalize::Normalizer;
use crate::vector::recorder::VectorRecorder;

/// Records every exchange while delegating to a live transport.
///
/// The caller receives the true responses; only the recorded pairs are
/// normalized.
pub struct RecordingTransport {
    inner: Arc<dyn Transport>,
    normalizer: Mutex<Normalizer>,
    recorder: Arc<Mutex<VectorRecorder>>,
}

impl RecordingTransport {
    /// Creates a recording transport wrapping `inner`.
    pub fn new(inner: Arc<dyn Transport>, recorder: Arc<Mutex<VectorRecorder>>) -> Self {
        Self { inner, normalizer: Mutex::new(Normalizer::new()), recorder }
    }
}

impl Transport for RecordingTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        Box::pin(async move {
            let outbound: Vec<Request> = {
                let normalizer = self.normalizer.lock().expect("normalizer lock poisoned");
                requests.iter().cloned().map(|r| normalizer.resolve_request(r)).collect()
            };

            let responses = self.inner.send(outbound).await?;
            if responses.len() != requests.len() {
                return Err(VectorError::transport(format!(
                    "live transport answered {} of {} requests",
                    responses.len(),
                    requests.len()
                )));
            }

            let mut normalizer = self.normalizer.lock().expect("normalizer lock poisoned");
            let mut recorder = self.recorder.lock().expect("recorder lock poisoned");
            for (request, response) in requests.into_iter().zip(&responses) {
                let response = normalizer.normalize_response(response.clone());
                let request = normalizer.normalize_request(request);
                recorder.record(Pair { request, response });
            }
            Ok(responses)
        })
    }

    fn close(&self) -> TransportFuture<'_, ()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::scripted::ScriptedTransport;
    use crate::ports::Response;
    use serde_json::json;

    fn recording(live: Arc<ScriptedTransport>) -> (RecordingTransport, Arc<Mutex<VectorRecorder>>) {
        let recorder = Arc::new(Mutex::new(VectorRecorder::new()));
        recorder.lock().unwrap().start();
        (RecordingTransport::new(live, Arc::clone(&recorder)), recorder)
    }

    #[tokio::test]
    async fn caller_sees_true_data_while_tape_is_normalized() {
        let live = Arc::new(ScriptedTransport::new(|request| {
            Ok(Response::ok(&request.id, json!({"TxHash": "C0FFEE", "CreatesContract": 1})))
        }));
        let (transport, recorder) = recording(live);

        let responses =
            transport.send(vec![Request::new("5", "transact", json!({"data": "60"}))]).await.unwrap();
        assert_eq!(responses[0].result, Some(json!({"TxHash": "C0FFEE", "CreatesContract": 1})));

        let vector = recorder.lock().unwrap().seal().unwrap();
        assert_eq!(vector.len(), 1);
        assert_eq!(
            vector.pairs()[0].response.result,
            Some(json!({"TxHash": "5", "CreatesContract": 1}))
        );
    }

    #[tokio::test]
    async fn real_subscription_ids_are_persisted_normalized() {
        let live = Arc::new(ScriptedTransport::new(|request| match request.method.as_str() {
            "eventSubscribe" => Ok(Response::ok(&request.id, json!({"subId": "abc123"}))),
            _ => Ok(Response::ok(&request.id, json!({"events": []}))),
        }));
        let (transport, recorder) = recording(Arc::clone(&live));

        let subscribed =
            transport.send(vec![Request::new("1", "eventSubscribe", json!({}))]).await.unwrap();
        assert_eq!(subscribed[0].result, Some(json!({"subId": "abc123"})));

        transport.send(vec![Request::new("2", "eventPoll", json!({"subId": "abc123"}))]).await.unwrap();
        assert_eq!(live.received()[1].params, json!({"subId": "abc123"}));

        let vector = recorder.lock().unwrap().seal().unwrap();
        assert_eq!(vector.pairs()[0].response.result, Some(json!({"subId": "0"})));
        assert_eq!(vector.pairs()[1].request.params, json!({"subId": "0"}));
    }

    #[tokio::test]
    async fn live_failure_propagates_and_keeps_earlier_pairs() {
        let live = Arc::new(ScriptedTransport::new(|request| {
            if request.method == "broken" {
                Err(VectorError::transport("connection reset"))
            } else {
                Ok(Response::ok(&request.id, json!({"ok": true})))
            }
        }));
        let (transport, recorder) = recording(live);

        transport.send(vec![Request::new("1", "getUint", json!({}))]).await.unwrap();
        let err = transport.send(vec![Request::new("2", "broken", json!({}))]).await.unwrap_err();
        assert!(matches!(err, VectorError::Transport(ref m) if m == "connection reset"));

        assert_eq!(recorder.lock().unwrap().seal().unwrap().len(), 1);
    }
}
