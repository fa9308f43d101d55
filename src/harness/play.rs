//! Play mode: serve recorded vectors to the SDK under test.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::{Session, SessionKey};
use crate::adapters::replaying::{ReplayState, ReplayingTransport};
use crate::error::{VectorError, VectorResult};
use crate::ports::Transport;
use crate::vector::format::VectorFile;
use crate::vector::store::VectorStore;

/// Replays a recorded document, one vector per session.
pub struct Player {
    document: VectorFile,
    transport: Arc<ReplayingTransport>,
}

impl Player {
    /// Play back `document`.
    #[must_use]
    pub fn new(document: VectorFile) -> Self {
        Self { document, transport: Arc::new(ReplayingTransport::new()) }
    }

    /// Load the document kept in `store`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the document is missing or malformed.
    pub fn load(store: &VectorStore) -> VectorResult<Self> {
        let document = store.load()?;
        info!(path = %store.path().display(), tests = document.it.len(), "loaded vectors");
        Ok(Self::new(document))
    }

    /// The mock transport handed to session bodies.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport) as Arc<dyn Transport>
    }

    /// The document being played back.
    #[must_use]
    pub fn document(&self) -> &VectorFile {
        &self.document
    }

    /// Replay the suite setup session.
    ///
    /// # Errors
    ///
    /// Returns a protocol mismatch if no setup was recorded or the body
    /// strays from the recording, otherwise the body's own error.
    pub async fn before<F, Fut, T>(&self, body: F) -> VectorResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<T>>,
    {
        self.run(SessionKey::Before, body).await
    }

    /// Replay the session of test `title`.
    ///
    /// # Errors
    ///
    /// Returns a protocol mismatch if `title` was never recorded or the body
    /// strays from the recording, otherwise the body's own error.
    pub async fn it<F, Fut, T>(&self, title: &str, body: F) -> VectorResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<T>>,
    {
        self.run(SessionKey::Test(title.to_string()), body).await
    }

    async fn run<F, Fut, T>(&self, key: SessionKey, body: F) -> VectorResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<T>>,
    {
        let vector = key
            .vector_in(&self.document)
            .ok_or_else(|| VectorError::mismatch(format!("no recorded conversation for {key}")))?;
        info!(session = %key, pairs = vector.len(), "replaying");
        self.transport.load(vector).await;

        let mut status = self.transport.subscribe();
        let session = Session { transport: self.transport(), account: self.document.account.clone() };
        // The mock may fail a request the body never awaits, or one whose
        // error the body swallows; either way the session fails.
        let outcome = tokio::select! {
            biased;
            error = first_failure(&mut status) => return Err(error),
            result = body(session) => result,
        };
        match self.transport.state().failure() {
            Some(error) => Err(error),
            None => outcome,
        }
    }
}

async fn first_failure(status: &mut watch::Receiver<ReplayState>) -> VectorError {
    loop {
        if let Some(error) = status.borrow_and_update().failure() {
            return error;
        }
        if status.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
