//! Record mode: run sessions against a live service and capture them.

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{info, warn};

use super::{read_account, Session, SessionKey};
use crate::adapters::live;
use crate::adapters::recording::RecordingTransport;
use crate::availability::wait_until_available;
use crate::config::HarnessConfig;
use crate::error::VectorResult;
use crate::ports::Transport;
use crate::vector::format::VectorFile;
use crate::vector::recorder::VectorRecorder;
use crate::vector::store::VectorStore;

/// Captures every session's conversation and writes the document when the
/// suite finishes.
///
/// Dropping an unfinished recorder still writes the document, so the
/// vectors of a suite that bailed out early are kept for debugging.
pub struct Recorder {
    transport: Arc<RecordingTransport>,
    tape: Arc<Mutex<VectorRecorder>>,
    document: Mutex<VectorFile>,
    store: VectorStore,
    finished: bool,
}

impl Recorder {
    /// Record the conversation carried by `live` into `store`.
    pub fn new(live: Arc<dyn Transport>, store: VectorStore, account: Option<Value>) -> Self {
        let tape = Arc::new(Mutex::new(VectorRecorder::new()));
        Self {
            transport: Arc::new(RecordingTransport::new(live, Arc::clone(&tape))),
            tape,
            document: Mutex::new(VectorFile { account, ..VectorFile::default() }),
            store,
            finished: false,
        }
    }

    /// Wait for the configured service, read the account and connect.
    ///
    /// # Errors
    ///
    /// Returns a config error without a URL, an availability timeout if the
    /// service stays unreachable, or a persistence error for a bad account
    /// file.
    pub async fn open(config: &HarnessConfig) -> VectorResult<Self> {
        let url = config.require_url()?;
        wait_until_available(url, config.poll_interval, config.setup_timeout).await?;
        let account = config.account.as_deref().map(read_account).transpose()?;
        let live = live::connect(url, config.method_prefix.as_deref());
        Ok(Self::new(live, VectorStore::new(&config.dir), account))
    }

    /// The recording transport handed to session bodies.
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport) as Arc<dyn Transport>
    }

    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn document(&self) -> VectorFile {
        self.document.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Record the suite setup session.
    ///
    /// # Errors
    ///
    /// Returns the body's error unchanged; the partial vector is kept.
    pub async fn before<F, Fut, T>(&self, body: F) -> VectorResult<T>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = VectorResult<T>>,
    {
        self.run(SessionKey::Before, body).await
    }

    /// Record the session of test `title`.
    ///
    /// # Errors
    ///
    /// Returns the body's error unchanged; the partial vector is kept.
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
        info!(session = %key, "recording");
        self.tape.lock().unwrap_or_else(PoisonError::into_inner).start();
        let _seal = SealGuard { recorder: self, key };
        let account = self.document.lock().unwrap_or_else(PoisonError::into_inner).account.clone();
        body(Session { transport: self.transport(), account }).await
    }

    /// Write the document and return its path.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the document cannot be written.
    pub fn finish(mut self) -> VectorResult<PathBuf> {
        self.finished = true;
        self.store.save(&self.document())
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(path = %self.store.path().display(), "recorder dropped without finish, saving vector");
        if let Err(e) = self.store.save(&self.document()) {
            warn!("failed to write vector: {e}");
        }
    }
}

/// Seals the open vector when a session settles, including on error, panic
/// or cancellation of the session future.
struct SealGuard<'a> {
    recorder: &'a Recorder,
    key: SessionKey,
}

impl Drop for SealGuard<'_> {
    fn drop(&mut self) {
        let sealed = self.recorder.tape.lock().unwrap_or_else(PoisonError::into_inner).seal();
        if let Some(vector) = sealed {
            info!(session = %self.key, pairs = vector.len(), "sealed");
            let mut document = self.recorder.document.lock().unwrap_or_else(PoisonError::into_inner);
            self.key.store_in(&mut document, vector);
        }
    }
}
