//! Transport wrapper that makes a live conversation deterministic.

use std::sync::{Arc, Mutex};

use crate::ports::{Request, Transport, TransportFuture};
use crate::vector::normalize::Normalizer;

/// Resolves normalized subscription ids on the way out and normalizes
/// responses on the way back. Owns its substitution table.
pub struct NormalizingTransport {
    inner: Arc<dyn Transport>,
    normalizer: Mutex<Normalizer>,
}

impl NormalizingTransport {
    /// Wrap `inner` with a fresh substitution table.
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner, normalizer: Mutex::new(Normalizer::new()) }
    }
}

impl Transport for NormalizingTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        Box::pin(async move {
            let outbound: Vec<Request> = {
                let normalizer = self.normalizer.lock().expect("normalizer lock poisoned");
                requests.into_iter().map(|r| normalizer.resolve_request(r)).collect()
            };
            let responses = self.inner.send(outbound).await?;
            let mut normalizer = self.normalizer.lock().expect("normalizer lock poisoned");
            Ok(responses.into_iter().map(|r| normalizer.normalize_response(r)).collect())
        })
    }

    fn close(&self) -> TransportFuture<'_, ()> {
        self.inner.close()
    }
}
