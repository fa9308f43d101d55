//! Harness configuration: which mode runs and where it looks.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{VectorError, VectorResult};

/// Default spacing between availability probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default deadline for a live service to become reachable.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(60);

/// The mutually exclusive harness modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run against a live service and capture the conversation.
    Record,
    /// Replay a captured conversation as a mock, with no network.
    #[default]
    Play,
    /// Replay captured client requests against a live service.
    Server,
}

impl FromStr for Mode {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Mode::Record),
            "play" | "" => Ok(Mode::Play),
            "server" => Ok(Mode::Server),
            other => Err(VectorError::Config(format!(
                "unknown mode {other:?}, expected record, play or server"
            ))),
        }
    }
}

/// Channel used to reach a live service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Request/response over HTTP.
    Http,
    /// Streaming over a WebSocket.
    WebSocket,
}

impl Protocol {
    /// Pick the protocol from the URL scheme (`ws`/`wss` or anything else).
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let scheme = url.split_once("://").map_or("", |(scheme, _)| scheme);
        if scheme.eq_ignore_ascii_case("ws") || scheme.eq_ignore_ascii_case("wss") {
            Protocol::WebSocket
        } else {
            Protocol::Http
        }
    }
}

/// Everything a harness needs, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Active mode.
    pub mode: Mode,
    /// Suite directory holding `vector.json`.
    pub dir: PathBuf,
    /// Live service URL (record and server modes).
    pub url: Option<String>,
    /// Account JSON captured into the document while recording.
    pub account: Option<PathBuf>,
    /// Namespace prepended to every method on the wire.
    pub method_prefix: Option<String>,
    /// Spacing between availability probes.
    pub poll_interval: Duration,
    /// Deadline for the live service to become reachable.
    pub setup_timeout: Duration,
}

impl HarnessConfig {
    /// Config for `mode` over the suite in `dir`, with default timings.
    pub fn new(mode: Mode, dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            dir: dir.into(),
            url: None,
            account: None,
            method_prefix: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }

    /// Set the live service URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the account file captured while recording.
    #[must_use]
    pub fn with_account(mut self, path: impl Into<PathBuf>) -> Self {
        self.account = Some(path.into());
        self
    }

    /// Set the wire method prefix.
    #[must_use]
    pub fn with_method_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.method_prefix = Some(prefix.into());
        self
    }

    /// Read the config from `VECTOR_MODE`, `VECTOR_DIR`, `VECTOR_URL`,
    /// `VECTOR_ACCOUNT` and `VECTOR_METHOD_PREFIX`.
    ///
    /// # Errors
    ///
    /// Returns a config error if `VECTOR_MODE` names an unknown mode.
    pub fn from_env() -> VectorResult<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        let mode = var("VECTOR_MODE").as_deref().map_or(Ok(Mode::default()), Mode::from_str)?;
        let mut config = Self::new(mode, var("VECTOR_DIR").unwrap_or_else(|| ".".into()));
        config.url = var("VECTOR_URL");
        config.account = var("VECTOR_ACCOUNT").map(PathBuf::from);
        config.method_prefix = var("VECTOR_METHOD_PREFIX");
        Ok(config)
    }

    /// The live URL, required outside play mode.
    ///
    /// # Errors
    ///
    /// Returns a config error if no URL was configured.
    pub fn require_url(&self) -> VectorResult<&str> {
        self.url.as_deref().ok_or_else(|| {
            VectorError::Config(format!("{:?} mode needs the URL of a live service", self.mode))
        })
    }
}
