//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `rpc-vector`.
#[derive(Debug, Parser)]
#[command(name = "rpc-vector", version, about = "Inspect and replay recorded JSON-RPC conversations")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Summarize the vector document of a suite.
    Show {
        /// Suite directory holding `vector.json`.
        #[arg(long, env = "VECTOR_DIR", default_value = ".")]
        dir: PathBuf,
        /// Print the recorded pairs of one test.
        title: Option<String>,
    },
    /// Block until a service answers.
    Wait {
        /// Service URL; `ws://` and `wss://` are probed with a WebSocket handshake.
        #[arg(env = "VECTOR_URL")]
        url: String,
        /// Milliseconds between probe attempts.
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
        /// Seconds to wait before giving up.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
    /// Replay recorded requests against a live service.
    Server {
        /// Suite directory holding `vector.json`.
        #[arg(long, env = "VECTOR_DIR", default_value = ".")]
        dir: PathBuf,
        /// Service URL.
        #[arg(long, env = "VECTOR_URL")]
        url: Option<String>,
        /// Namespace prepended to every method on the wire.
        #[arg(long, env = "VECTOR_METHOD_PREFIX")]
        method_prefix: Option<String>,
        /// Replay only these tests (repeatable). Defaults to every test.
        #[arg(long = "test")]
        tests: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_show_subcommand() {
        let cli = Cli::parse_from(["rpc-vector", "show", "--dir", "suite", "sets and gets"]);
        assert!(matches!(cli.command, Command::Show { ref title, .. } if title.as_deref() == Some("sets and gets")));
    }

    #[test]
    fn parses_wait_defaults() {
        let cli = Cli::parse_from(["rpc-vector", "wait", "http://localhost:8080"]);
        assert!(matches!(
            cli.command,
            Command::Wait { interval_ms: 100, timeout_secs: 60, .. }
        ));
    }

    #[test]
    fn parses_repeated_tests_for_server() {
        let cli = Cli::parse_from([
            "rpc-vector",
            "server",
            "--url",
            "ws://localhost:1337/socketrpc",
            "--test",
            "a",
            "--test",
            "b",
        ]);
        let Command::Server { url, tests, .. } = cli.command else {
            panic!("expected server command");
        };
        assert_eq!(url.as_deref(), Some("ws://localhost:1337/socketrpc"));
        assert_eq!(tests, vec!["a", "b"]);
    }
}
