//! Running an external tool under a deadline.
//!
//! Both output pipes are drained on their own tasks while the child runs, so a
//! chatty tool can never block on a full pipe. On deadline or cancellation the
//! child is killed and reaped before returning.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Bytes kept per stream; further output is drained and dropped.
const MAX_CAPTURED_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("I/O error while waiting: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run_with_timeout(
    spec: &CommandSpec,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ProcessError> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    tracing::debug!("Running `{}` (timeout {:?})", spec.display(), timeout);
    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: spec.program.clone(),
        source,
    })?;

    let stdout_task = tokio::spawn(drain(child.stdout.take(), "stdout"));
    let stderr_task = tokio::spawn(drain(child.stderr.take(), "stderr"));

    let outcome = tokio::select! {
        status = child.wait() => status.map_err(ProcessError::from),
        _ = tokio::time::sleep(timeout) => Err(ProcessError::TimedOut(timeout)),
        _ = cancel.cancelled() => Err(ProcessError::Cancelled),
    };

    match outcome {
        Ok(status) => {
            let stdout = stdout_task.await.unwrap_or_default();
            let stderr = stderr_task.await.unwrap_or_default();
            Ok(CommandOutput {
                code: status.code(),
                stdout,
                stderr,
            })
        }
        Err(err) => {
            tracing::warn!("`{}` aborted: {}", spec.display(), err);
            let _ = child.start_kill();
            let _ = child.wait().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(err)
        }
    }
}

async fn drain<R>(reader: Option<R>, stream: &'static str) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut lines = BufReader::new(reader).lines();
    let mut captured = String::new();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::trace!(target: "stratum::process", "[{}] {}", stream, line);
                if captured.len() + line.len() < MAX_CAPTURED_BYTES {
                    captured.push_str(&line);
                    captured.push('\n');
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("Stopped reading {}: {}", stream, e);
                break;
            }
        }
    }
    captured
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let spec = CommandSpec::new("sh").arg("-c").arg("echo hello; echo oops >&2; exit 3");
        let out = run_with_timeout(&spec, Duration::from_secs(10), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let spec = CommandSpec::new("sh").arg("-c").arg("sleep 30");
        let started = Instant::now();
        let err = run_with_timeout(&spec, Duration::from_millis(200), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_large_output_does_not_block() {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done");
        let out = run_with_timeout(&spec, Duration::from_secs(30), &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.success());
        assert!(out.stdout.starts_with("line-0\n"));
        assert!(out.stdout.len() <= MAX_CAPTURED_BYTES);
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let spec = CommandSpec::new("stratum-definitely-missing-tool");
        let err = run_with_timeout(&spec, Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_stops_child() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });
        let spec = CommandSpec::new("sh").arg("-c").arg("sleep 30");
        let err = run_with_timeout(&spec, Duration::from_secs(60), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled));
    }
}
