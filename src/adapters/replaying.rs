//! Replaying adapter for the `Transport` port.
//!
//! Serves recorded responses strictly in send order from a FIFO queue.
//! The queue lock is held across the dequeue, so concurrent callers are
//! answered in the order their sends reached the transport.

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};

use crate::error::{VectorError, VectorResult};
use crate::ports::{Request, Response, Transport, TransportFuture};
use crate::vector::format::{Pair, Vector};

/// Position of the replay state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayState {
    /// No recording loaded yet.
    Idle,
    /// Serving a loaded recording.
    Replaying,
    /// A request arrived after the end of the recording.
    Exhausted(String),
    /// A request diverged from the recorded conversation.
    Mismatched(String),
}

impl ReplayState {
    /// The failure this state represents, if it is terminal.
    #[must_use]
    pub fn failure(&self) -> Option<VectorError> {
        match self {
            ReplayState::Exhausted(message) | ReplayState::Mismatched(message) => {
                Some(VectorError::mismatch(message.clone()))
            }
            ReplayState::Idle | ReplayState::Replaying => None,
        }
    }
}

/// Queue element: a recorded pair or the end of the recording.
#[derive(Debug)]
enum Cue {
    Pair(Pair),
    End,
}

/// Mock transport fed from stored vectors.
pub struct ReplayingTransport {
    feed: mpsc::UnboundedSender<Cue>,
    queue: Mutex<mpsc::UnboundedReceiver<Cue>>,
    status: watch::Sender<ReplayState>,
}

impl Default for ReplayingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayingTransport {
    /// Creates an idle transport with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (feed, queue) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ReplayState::Idle);
        Self { feed, queue: Mutex::new(queue), status }
    }

    /// Queue `vector` for replay, discarding whatever a previous session left
    /// unconsumed. The vector itself is not modified.
    pub async fn load(&self, vector: &Vector) {
        let mut queue = self.queue.lock().await;
        let mut stale = 0usize;
        while queue.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            debug!(stale, "discarded unconsumed replay entries");
        }

        self.status.send_replace(ReplayState::Replaying);
        for pair in vector.pairs() {
            // The receiver lives in `self`, so the channel cannot be closed.
            let _ = self.feed.send(Cue::Pair(pair.clone()));
        }
        if vector.is_sealed() {
            let _ = self.feed.send(Cue::End);
        }
    }

    /// Watch the replay state; used to fail a session as soon as the mock
    /// detects a divergence.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReplayState> {
        self.status.subscribe()
    }

    /// Current replay state.
    #[must_use]
    pub fn state(&self) -> ReplayState {
        self.status.borrow().clone()
    }

    fn fail(&self, state: ReplayState) -> VectorError {
        warn!(?state, "replay stopped");
        let error = state.failure().unwrap_or_else(|| VectorError::mismatch("replay stopped"));
        self.status.send_if_modified(|current| {
            if current.failure().is_some() {
                return false;
            }
            *current = state;
            true
        });
        error
    }

    async fn replay(&self, requests: Vec<Request>) -> VectorResult<Vec<Response>> {
        // The state is read under the queue lock: a sender that was waiting
        // for the lock must see an end-of-recording consumed by the holder.
        let mut queue = self.queue.lock().await;
        match self.state() {
            ReplayState::Idle => {
                return Err(VectorError::mismatch(format!(
                    "{} request(s) issued before any recording was loaded",
                    requests.len()
                )));
            }
            state => {
                if let Some(error) = state.failure() {
                    return Err(error);
                }
            }
        }

        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            match queue.recv().await {
                Some(Cue::Pair(pair)) if pair.request.method == request.method => {
                    debug!(id = %request.id, method = %request.method, "replaying response");
                    responses.push(pair.response);
                }
                Some(Cue::Pair(pair)) => {
                    return Err(self.fail(ReplayState::Mismatched(format!(
                        "request {} called {} but the recording expects {}",
                        request.id, request.method, pair.request.method
                    ))));
                }
                Some(Cue::End) | None => {
                    return Err(self.fail(ReplayState::Exhausted(format!(
                        "unexpected extra request {} ({}) after the recorded conversation ended",
                        request.id, request.method
                    ))));
                }
            }
        }
        Ok(responses)
    }
}

impl Transport for ReplayingTransport {
    fn send(&self, requests: Vec<Request>) -> TransportFuture<'_> {
        Box::pin(self.replay(requests))
    }
}
