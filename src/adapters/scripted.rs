//! In-memory transport answering from a closure.
//!
//! Stands in for a live service wherever a test needs a deterministic
//! backend: every request is handed to the script and its answer returned.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::VectorResult;
use crate::ports::{Request, Response, Transport, TransportFuture};

type Script = dyn Fn(&Request) -> VectorResult<Response> + Send + Sync;

/// Transport whose answers come from a script closure.
pub struct ScriptedTransport {
    script: Box<Script>,
    received: Mutex<Vec<Request>>,
    closes: AtomicUsize,
}

impl ScriptedTransport {
    /// Creates a transport answering every request with `script`.
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&Request) -> VectorResult<Response> + Send + Sync + 'static,
    {
        Self { script: Box::new(script), received: Mutex::new(Vec::new()), closes: AtomicUsize::new(0) }
    }

    /// Every request received so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the request log lock is poisoned.
    #[must_use]
    pub fn received(&self) -> Vec<Request> {
        self.received.lock().expect("request log lock poisoned").clone()
    }

    /// How many times the stream was closed.
    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        let result: VectorResult<Vec<Response>> = requests
            .iter()
            .map(|request| {
                self.received.lock().expect("request log lock poisoned").push(request.clone());
                (self.script)(request)
            })
            .collect();
        Box::pin(async move { result })
    }

    fn close(&self) -> TransportFuture<'_, ()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
