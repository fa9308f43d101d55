//! Error taxonomy for the record/replay harness.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by transports, the vector store and the harness modes.
#[derive(Error, Debug)]
pub enum VectorError {
    /// The conversation under test diverged from the recorded vector, or the
    /// vector itself is unusable for replay.
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// The live transport rejected a request or answered with something
    /// that is not a JSON-RPC response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service never became reachable before the setup deadline.
    #[error("{url} did not become available within {waited:?}")]
    AvailabilityTimeout {
        /// Address that was probed.
        url: String,
        /// Deadline that expired.
        waited: Duration,
    },

    /// Reading or writing a vector document failed.
    #[error("failed to {action} {}: {message}", path.display())]
    Persistence {
        /// What was being attempted ("read", "write", "parse", ...).
        action: &'static str,
        /// The vector document involved.
        path: PathBuf,
        /// Underlying cause.
        message: String,
    },

    /// The harness configuration is incomplete or contradictory.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VectorError {
    /// Create a protocol mismatch error.
    pub fn mismatch<S: Into<String>>(message: S) -> Self {
        Self::ProtocolMismatch(message.into())
    }

    /// Create a transport failure error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a persistence error for `path`.
    pub fn persistence(
        action: &'static str,
        path: impl Into<PathBuf>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Persistence { action, path: path.into(), message: message.to_string() }
    }
}

/// Result type used throughout the crate.
pub type VectorResult<T> = std::result::Result<T, VectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_message_names_the_file() {
        let err = VectorError::persistence("parse", "/tmp/suite/vector.json", "EOF while parsing");
        assert_eq!(
            err.to_string(),
            "failed to parse /tmp/suite/vector.json: EOF while parsing"
        );
    }

    #[test]
    fn availability_timeout_mentions_url() {
        let err = VectorError::AvailabilityTimeout {
            url: "http://localhost:1337/rpc".into(),
            waited: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("http://localhost:1337/rpc"));
    }
}
