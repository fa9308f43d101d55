//! Test harness running sessions in record, play or server mode.
//!
//! A suite opens one [`Harness`], runs an optional setup session through
//! [`Harness::before`], one session per test through [`Harness::it`], and
//! calls [`Harness::finish`] at the end. Session bodies receive a
//! [`Session`] whose transport is the same shape in every mode.

pub mod play;
pub mod record;
pub mod server;

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::config::{HarnessConfig, Mode};
use crate::error::{VectorError, VectorResult};
use crate::ports::Transport;
use crate::vector::format::{Vector, VectorFile};
use crate::vector::store::VectorStore;

pub use play::Player;
pub use record::Recorder;
pub use server::ServerReplayer;

/// What a session body gets to work with.
#[derive(Clone)]
pub struct Session {
    /// Transport for the SDK under test.
    pub transport: Arc<dyn Transport>,
    /// Account data captured during setup, if any.
    pub account: Option<Value>,
}

/// Which vector of the document a session reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKey {
    /// Suite setup.
    Before,
    /// A test, by title.
    Test(String),
}

impl SessionKey {
    /// The recorded vector for this session.
    #[must_use]
    pub fn vector_in<'a>(&self, document: &'a VectorFile) -> Option<&'a Vector> {
        match self {
            SessionKey::Before => document.before.as_ref(),
            SessionKey::Test(title) => document.it.get(title),
        }
    }

    /// Store `vector` as this session's recording.
    pub fn store_in(&self, document: &mut VectorFile, vector: Vector) {
        match self {
            SessionKey::Before => document.before = Some(vector),
            SessionKey::Test(title) => {
                document.it.insert(title.clone(), vector);
            }
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Before => f.write_str("before"),
            SessionKey::Test(title) => write!(f, "it {title:?}"),
        }
    }
}

/// Read the opaque account JSON captured into the document.
///
/// # Errors
///
/// Returns a persistence error if the file cannot be read or parsed.
pub fn read_account(path: &Path) -> VectorResult<Value> {
    let content =
        std::fs::read_to_string(path).map_err(|e| VectorError::persistence("read", path, e))?;
    serde_json::from_str(&content).map_err(|e| VectorError::persistence("parse", path, e))
}

/// Exactly one active mode for a suite.
pub enum Harness {
    /// Capture the conversation with a live service.
    Record(Recorder),
    /// Replay the captured conversation as a mock.
    Play(Player),
    /// Replay captured requests against a live service.
    Server(ServerReplayer),
}

impl Harness {
    /// Build the harness the config's mode selects.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector document cannot be loaded (play and
    /// server modes), the live service is unreachable before the setup
    /// deadline (record and server modes), or the config is incomplete.
    pub async fn open(config: &HarnessConfig) -> VectorResult<Self> {
        match config.mode {
            Mode::Record => Recorder::open(config).await.map(Harness::Record),
            Mode::Play => Player::load(&VectorStore::new(&config.dir)).map(Harness::Play),
            Mode::Server => ServerReplayer::open(config).await.map(Harness::Server),
        }
    }

    /// The active mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            Harness::Record(_) => Mode::Record,
            Harness::Play(_) => Mode::Play,
            Harness::Server(_) => Mode::Server,
        }
    }

    /// Run the suite setup session. Server mode replays the recorded setup
    /// requests instead of running `body`.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the mode's replay/persistence failure.
    pub async fn before<F, Fut>(&self, body: F) -> VectorResult<()>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<()>>,
    {
        match self {
            Harness::Record(recorder) => recorder.before(body).await,
            Harness::Play(player) => player.before(body).await,
            Harness::Server(server) => server.before().await.map(|_| ()),
        }
    }

    /// Run the session for test `title`. Server mode replays the recorded
    /// requests instead of running `body`.
    ///
    /// # Errors
    ///
    /// Returns the body's error, or the mode's replay/persistence failure.
    pub async fn it<F, Fut>(&self, title: &str, body: F) -> VectorResult<()>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<()>>,
    {
        match self {
            Harness::Record(recorder) => recorder.it(title, body).await,
            Harness::Play(player) => player.it(title, body).await,
            Harness::Server(server) => server.it(title).await.map(|_| ()),
        }
    }

    /// End the suite: record mode writes the document.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the document cannot be written.
    pub fn finish(self) -> VectorResult<()> {
        match self {
            Harness::Record(recorder) => recorder.finish().map(|_| ()),
            Harness::Play(_) | Harness::Server(_) => Ok(()),
        }
    }
}
