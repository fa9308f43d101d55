//! Collects pairs into the vector of the session currently being recorded.

use tracing::warn;

use super::format::{Pair, Vector};

/// Lifecycle of the tape between sessions.
#[derive(Debug)]
enum TapeState {
    /// No session open.
    Idle,
    /// A session is open and pairs are being appended.
    Recording(Vector),
}

/// Appends normalized pairs to the open session's vector and seals it when
/// the session ends.
#[derive(Debug)]
pub struct VectorRecorder {
    state: TapeState,
    unrecorded: usize,
}

impl Default for VectorRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorRecorder {
    /// Create an idle recorder.
    #[must_use]
    pub fn new() -> Self {
        Self { state: TapeState::Idle, unrecorded: 0 }
    }

    /// Open a new, empty vector. A vector still open from an earlier session
    /// is discarded.
    pub fn start(&mut self) {
        if let TapeState::Recording(previous) = &self.state {
            warn!(pairs = previous.len(), "discarding vector of a session that was never sealed");
        }
        self.state = TapeState::Recording(Vector::new());
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.state, TapeState::Recording(_))
    }

    /// Append a pair to the open vector. Pairs arriving while no session is
    /// open are counted and dropped.
    pub fn record(&mut self, pair: Pair) {
        match &mut self.state {
            TapeState::Recording(vector) => vector.push(pair),
            TapeState::Idle => {
                self.unrecorded += 1;
                warn!(method = %pair.request.method, "request outside a recording session was not recorded");
            }
        }
    }

    /// Append the end-of-conversation marker and hand back the sealed vector,
    /// returning the recorder to idle. Returns `None` if no session is open.
    pub fn seal(&mut self) -> Option<Vector> {
        match std::mem::replace(&mut self.state, TapeState::Idle) {
            TapeState::Recording(mut vector) => {
                vector.seal();
                Some(vector)
            }
            TapeState::Idle => None,
        }
    }

    /// Number of pairs dropped because no session was open.
    #[must_use]
    pub fn unrecorded(&self) -> usize {
        self.unrecorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Request, Response};
    use serde_json::json;

    fn pair(id: &str) -> Pair {
        Pair {
            request: Request::new(id, "getUint", json!({})),
            response: Response::ok(id, json!({"ok": true})),
        }
    }

    #[test]
    fn record_and_seal() {
        let mut recorder = VectorRecorder::new();
        recorder.start();
        recorder.record(pair("1"));
        recorder.record(pair("2"));

        let vector = recorder.seal().expect("session was open");
        assert!(vector.is_sealed());
        assert_eq!(vector.len(), 2);
        assert_eq!(vector.pairs()[1].request.id, "2");
        assert!(!recorder.is_recording());
    }

    #[test]
    fn pairs_outside_a_session_are_dropped() {
        let mut recorder = VectorRecorder::new();
        recorder.record(pair("1"));
        assert_eq!(recorder.unrecorded(), 1);
        assert!(recorder.seal().is_none());
    }

    #[test]
    fn start_resets_the_tape() {
        let mut recorder = VectorRecorder::new();
        recorder.start();
        recorder.record(pair("1"));
        recorder.start();
        assert!(recorder.seal().unwrap().is_empty());
    }
}
