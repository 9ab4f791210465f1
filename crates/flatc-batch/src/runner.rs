//! Compiler process execution.

use crate::error::InvokeError;
use crate::invocation::Invocation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Exit code recorded when the process ended without one (signal, timeout).
pub const NO_EXIT_CODE: i32 = -1;

/// Captured result of one compiler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the invocation was killed by the timeout.
    pub timed_out: bool,
}

impl InvocationOutput {
    /// Output of a process that exited with `exit_code`.
    pub fn exited(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            duration_ms: 0,
            timed_out: false,
        }
    }

    /// Whether the compiler accepted the schema.
    pub fn passed(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// Diagnostic text for a failed invocation.
    ///
    /// stderr when present, else stdout, else the exit code.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("compiler exited with code {}", self.exit_code)
    }
}

/// Runs compiler invocations.
///
/// Returns `Err` only when the invocation could not happen at all; a
/// compiler that ran and rejected its input is an `Ok` with a non-zero code.
#[async_trait]
pub trait CompilerInvoker: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, InvokeError>;
}

/// Time allowed for pipe readers to drain after a timed-out child is killed.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Invoker that spawns the real compiler executable.
///
/// On timeout the child is killed; whatever it had already written is kept
/// and a "timed out" line is appended to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    /// Invoker that resolves the executable the way the OS does (PATH lookup
    /// for bare names).
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CompilerInvoker for ProcessInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, InvokeError> {
        let start = Instant::now();

        let mut child = Command::new(&invocation.executable)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Launch {
                executable: invocation.executable.clone(),
                source,
            })?;

        let stdout = PipeCapture::spawn(child.stdout.take());
        let stderr = PipeCapture::spawn(child.stderr.take());

        let status = if invocation.timeout_secs > 0 {
            match tokio::time::timeout(
                Duration::from_secs(invocation.timeout_secs),
                child.wait(),
            )
            .await
            {
                Ok(status) => Some(status?),
                Err(_) => {
                    child.kill().await.ok();
                    None
                }
            }
        } else {
            Some(child.wait().await?)
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        let Some(status) = status else {
            // Grandchildren may still hold the pipes open; keep what arrived.
            let stdout = stdout.finish(Some(DRAIN_GRACE)).await;
            let mut stderr = stderr.finish(Some(DRAIN_GRACE)).await;
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!(
                "compiler timed out after {} seconds",
                invocation.timeout_secs
            ));
            warn!(input = %invocation.input.display(), duration_ms, "compiler timed out");
            return Ok(InvocationOutput {
                exit_code: NO_EXIT_CODE,
                stdout,
                stderr,
                duration_ms,
                timed_out: true,
            });
        };

        debug!(input = %invocation.input.display(), duration_ms, "compiler exited");

        Ok(InvocationOutput {
            exit_code: status.code().unwrap_or(NO_EXIT_CODE),
            stdout: stdout.finish(None).await,
            stderr: stderr.finish(None).await,
            duration_ms,
            timed_out: false,
        })
    }
}

/// Background reader collecting one child pipe into a shared buffer.
struct PipeCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl PipeCapture {
    fn spawn<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = buffer.clone();
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 4096];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .extend_from_slice(&chunk[..n]),
                }
            }
        });
        Self { buffer, task }
    }

    /// Wait for the pipe to close (bounded by `grace` when given) and
    /// return what was read.
    async fn finish(self, grace: Option<Duration>) -> String {
        let PipeCapture { buffer, mut task } = self;
        match grace {
            Some(grace) => {
                if tokio::time::timeout(grace, &mut task).await.is_err() {
                    task.abort();
                }
            }
            None => {
                task.await.ok();
            }
        }
        let bytes = buffer.lock().unwrap_or_else(|e| e.into_inner());
        let text = String::from_utf8_lossy(&bytes).to_string();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::invocation::SchemaInput;

    #[test]
    fn test_output_passed() {
        assert!(InvocationOutput::exited(0, "", "").passed());
        assert!(!InvocationOutput::exited(1, "", "error").passed());
    }

    #[test]
    fn test_timed_out_never_passes() {
        let mut output = InvocationOutput::exited(0, "", "");
        output.timed_out = true;
        assert!(!output.passed());
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let output = InvocationOutput::exited(1, "out text", "  error: bad schema\n");
        assert_eq!(output.diagnostic(), "error: bad schema");
    }

    #[test]
    fn test_diagnostic_falls_back_to_stdout_then_code() {
        assert_eq!(
            InvocationOutput::exited(1, "only stdout", "").diagnostic(),
            "only stdout"
        );
        assert_eq!(
            InvocationOutput::exited(3, "", "").diagnostic(),
            "compiler exited with code 3"
        );
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let config = BatchConfig::new("/nonexistent/dir/flatc", "/tmp/out", "--cpp");
        let inv = Invocation::for_input(&config, &SchemaInput::new("/tmp/a.fbs"));

        let err = ProcessInvoker::new().invoke(&inv).await.unwrap_err();
        assert!(err.is_environment());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_captured() {
        let config = BatchConfig::new("false", "/tmp/out", "--cpp");
        let inv = Invocation::for_input(&config, &SchemaInput::new("/tmp/a.fbs"));

        let output = ProcessInvoker::new().invoke(&inv).await.expect("invoke failed");
        assert!(!output.passed());
        assert_ne!(output.exit_code, 0);
        assert!(!output.timed_out);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo_receives_arguments() {
        let config = BatchConfig::new("echo", "/tmp/out", "--cpp");
        let inv = Invocation::for_input(&config, &SchemaInput::new("/tmp/x/a.fbs"));

        let output = ProcessInvoker::new().invoke(&inv).await.expect("invoke failed");
        assert!(output.passed());
        assert_eq!(output.stdout.trim(), "--cpp -o /tmp/out -I /tmp/x /tmp/x/a.fbs");
    }
}
