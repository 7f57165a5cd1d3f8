//! # Saorsa Canvas CLI
//!
//! Applies JSON commands to a scene stored on disk, one response per line.
//!
//! ## Usage
//!
//! ```text
//! canvas-cli --data-dir ./scenes --scene board \
//!     --command '{"type":"read","id":1,"params":{}}'
//!
//! # or stream requests, one JSON object per line
//! cat commands.jsonl | canvas-cli --scene board
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::PathBuf;
use std::time::Duration;

use canvas_core::CommandResponse;
use canvas_host::CommandDispatcher;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Default scene key.
pub const DEFAULT_SCENE: &str = "default";

/// Default load timeout in milliseconds.
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

/// Command-line arguments for canvas-cli.
#[derive(Debug, Clone, Parser)]
#[command(name = "canvas-cli")]
#[command(about = "Apply structured commands to a stored drawing scene")]
#[command(version)]
pub struct CliArgs {
    /// Directory holding one JSON file per scene
    #[arg(long, env = "CANVAS_DATA_DIR", default_value = "scenes")]
    pub data_dir: PathBuf,

    /// Scene key to open
    #[arg(long, env = "CANVAS_SCENE", default_value = DEFAULT_SCENE)]
    pub scene: String,

    /// A single JSON request; read requests from stdin when absent
    #[arg(long)]
    pub command: Option<String>,

    /// Give up loading the scene after this many milliseconds
    #[arg(long, default_value_t = DEFAULT_LOAD_TIMEOUT_MS)]
    pub load_timeout_ms: u64,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Scene storage directory.
    pub data_dir: PathBuf,
    /// Scene key.
    pub scene: String,
    /// One-shot request, if given.
    pub command: Option<String>,
    /// Scene load timeout.
    pub load_timeout: Duration,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("scenes"),
            scene: DEFAULT_SCENE.to_string(),
            command: None,
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
        }
    }
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            scene: args.scene,
            command: args.command,
            load_timeout: Duration::from_millis(args.load_timeout_ms),
        }
    }
}

/// Write one response as a single JSON line.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_response<W>(output: &mut W, response: &CommandResponse) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await
}

/// Dispatch one request per non-blank input line, answering each in order.
///
/// Returns the number of requests handled.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run_commands<R, W>(
    dispatcher: &CommandDispatcher,
    input: R,
    output: &mut W,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = dispatcher.dispatch_json(line).await;
        write_response(output, &response).await?;
        handled += 1;
    }
    tracing::debug!("Handled {handled} requests");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = CliArgs::try_parse_from(["canvas-cli"]).expect("parse");
        let config = CliConfig::from(args);
        assert_eq!(config.scene, DEFAULT_SCENE);
        assert_eq!(config.load_timeout, Duration::from_millis(5_000));
        assert!(config.command.is_none());
    }

    #[test]
    fn test_args_overrides() {
        let args = CliArgs::try_parse_from([
            "canvas-cli",
            "--data-dir",
            "/tmp/boards",
            "--scene",
            "plan",
            "--command",
            r#"{"type":"read"}"#,
            "--load-timeout-ms",
            "250",
        ])
        .expect("parse");
        let config = CliConfig::from(args);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/boards"));
        assert_eq!(config.scene, "plan");
        assert_eq!(config.command.as_deref(), Some(r#"{"type":"read"}"#));
        assert_eq!(config.load_timeout, Duration::from_millis(250));
    }
}
