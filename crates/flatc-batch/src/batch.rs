//! Batch orchestration: one compiler invocation per schema, in order.

use crate::config::BatchConfig;
use crate::error::{BatchError, InvokeError};
use crate::invocation::{Invocation, SchemaInput};
use crate::runner::{CompilerInvoker, InvocationOutput, ProcessInvoker, NO_EXIT_CODE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of compiling one schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Failed { message: String },
}

/// Result of one invocation within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// Schema that was compiled.
    pub input: SchemaInput,

    /// Success or failure with diagnostics.
    #[serde(flatten)]
    pub status: ItemStatus,

    /// Compiler exit code.
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl ItemResult {
    fn from_output(input: SchemaInput, output: InvocationOutput) -> Self {
        let status = if output.passed() {
            ItemStatus::Succeeded
        } else {
            ItemStatus::Failed {
                message: output.diagnostic(),
            }
        };
        Self {
            input,
            status,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            duration_ms: output.duration_ms,
        }
    }

    fn from_io_error(input: SchemaInput, err: &InvokeError) -> Self {
        Self {
            input,
            status: ItemStatus::Failed {
                message: err.to_string(),
            },
            exit_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr: err.to_string(),
            duration_ms: 0,
        }
    }

    /// Whether this schema compiled.
    pub fn succeeded(&self) -> bool {
        matches!(self.status, ItemStatus::Succeeded)
    }

    /// Failure message, if any.
    pub fn failure_message(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Succeeded => None,
            ItemStatus::Failed { message } => Some(message),
        }
    }
}

/// Why a batch stopped before reaching every schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbortReason {
    /// Schema whose invocation could not be launched.
    pub input: SchemaInput,

    /// Executable that was attempted.
    pub executable: PathBuf,

    /// Launch error text.
    pub message: String,
}

/// Report of a complete batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Batch identifier.
    pub batch_id: Uuid,

    /// Per-schema results, in input order.
    pub results: Vec<ItemResult>,

    /// Number of compiler launches attempted (including a failed launch).
    pub invocations: usize,

    /// Set when the compiler could not be launched and the batch stopped.
    pub aborted: Option<AbortReason>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Whether every schema compiled and the batch ran to the end.
    pub fn success(&self) -> bool {
        self.aborted.is_none() && self.results.iter().all(ItemResult::succeeded)
    }

    /// Number of schemas that compiled.
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    /// Number of schemas the compiler rejected.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.succeeded()).count()
    }

    /// Results for schemas that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }

    /// Result for the schema with the given file name.
    pub fn result_for(&self, name: &str) -> Option<&ItemResult> {
        self.results.iter().find(|r| r.input.name() == name)
    }
}

/// Runs the schema compiler over a batch of inputs.
pub struct BatchRunner {
    config: BatchConfig,
    invoker: Arc<dyn CompilerInvoker>,
}

impl BatchRunner {
    /// Runner that spawns the configured compiler executable.
    pub fn new(config: BatchConfig) -> Self {
        Self::with_invoker(config, Arc::new(ProcessInvoker::new()))
    }

    /// Runner with a custom invoker.
    pub fn with_invoker(config: BatchConfig, invoker: Arc<dyn CompilerInvoker>) -> Self {
        Self { config, invoker }
    }

    /// Compile every input in order.
    ///
    /// A schema the compiler rejects is recorded and the batch moves on.
    /// A compiler that cannot be launched stops the batch; the report's
    /// `aborted` field names it and no later schema is attempted.
    pub async fn run(&self, inputs: &[SchemaInput]) -> Result<BatchReport, BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::NoInputs);
        }

        let output_dir = &self.config.output_directory;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| BatchError::OutputDirectory {
                path: output_dir.clone(),
                source,
            })?;

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            batch_id = %batch_id,
            schemas = inputs.len(),
            output_dir = %output_dir.display(),
            "Starting schema batch"
        );

        let mut results = Vec::with_capacity(inputs.len());
        let mut invocations = 0usize;
        let mut aborted = None;

        for input in inputs {
            let invocation = Invocation::for_input(&self.config, input);
            info!(schema = %input.name(), command = %invocation.command_line(), "Compiling");
            invocations += 1;

            match self.invoker.invoke(&invocation).await {
                Ok(output) => {
                    let result = ItemResult::from_output(input.clone(), output);
                    match &result.status {
                        ItemStatus::Succeeded => {
                            info!(schema = %input.name(), duration_ms = result.duration_ms, "Compiled");
                        }
                        ItemStatus::Failed { message } => {
                            warn!(
                                schema = %input.name(),
                                exit_code = result.exit_code,
                                "Compilation failed:\n{}",
                                message
                            );
                        }
                    }
                    results.push(result);
                }
                Err(err) if err.is_environment() => {
                    error!(
                        executable = %invocation.executable.display(),
                        "{}; aborting batch",
                        err
                    );
                    aborted = Some(AbortReason {
                        input: input.clone(),
                        executable: invocation.executable.clone(),
                        message: err.to_string(),
                    });
                    break;
                }
                Err(err) => {
                    warn!(schema = %input.name(), "Compilation failed: {}", err);
                    results.push(ItemResult::from_io_error(input.clone(), &err));
                }
            }
        }

        let report = BatchReport {
            batch_id,
            results,
            invocations,
            aborted,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            batch_id = %batch_id,
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            aborted = report.aborted.is_some(),
            "Schema batch finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedInvoker;

    fn item(name: &str, status: ItemStatus) -> ItemResult {
        ItemResult {
            input: SchemaInput::new(format!("/schemas/{}", name)),
            status,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 10,
        }
    }

    fn report(results: Vec<ItemResult>, aborted: Option<AbortReason>) -> BatchReport {
        BatchReport {
            batch_id: Uuid::new_v4(),
            invocations: results.len(),
            results,
            aborted,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_counts() {
        let report = report(
            vec![
                item("a.fbs", ItemStatus::Succeeded),
                item(
                    "b.fbs",
                    ItemStatus::Failed {
                        message: "error".to_string(),
                    },
                ),
            ],
            None,
        );

        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            report.result_for("b.fbs").and_then(|r| r.failure_message()),
            Some("error")
        );
    }

    #[test]
    fn test_aborted_report_is_not_success() {
        let report = report(
            vec![],
            Some(AbortReason {
                input: SchemaInput::new("/schemas/a.fbs"),
                executable: PathBuf::from("flatc"),
                message: "not found".to_string(),
            }),
        );
        assert!(!report.success());
        assert_eq!(report.failed_count(), 0);
    }

    #[test]
    fn test_item_status_serializes_tagged() {
        let json = serde_json::to_value(item(
            "a.fbs",
            ItemStatus::Failed {
                message: "bad".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "bad");
        assert_eq!(json["input"], "/schemas/a.fbs");
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let runner = BatchRunner::with_invoker(
            BatchConfig::new("flatc", &out, "--cpp"),
            Arc::new(ScriptedInvoker::succeeding()),
        );

        let err = runner.run(&[]).await.unwrap_err();
        assert!(matches!(err, BatchError::NoInputs));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_io_error_after_launch_is_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = Arc::new(ScriptedInvoker::succeeding().with_io_error("a.fbs"));
        let runner = BatchRunner::with_invoker(
            BatchConfig::new("flatc", dir.path().join("out"), "--cpp"),
            invoker.clone(),
        );

        let report = runner
            .run(&[
                SchemaInput::new("/schemas/a.fbs"),
                SchemaInput::new("/schemas/b.fbs"),
            ])
            .await
            .unwrap();

        assert!(report.aborted.is_none());
        assert!(!report.results[0].succeeded());
        assert!(report.results[1].succeeded());
        assert_eq!(invoker.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_output_directory_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let invoker = Arc::new(ScriptedInvoker::succeeding());
        let runner = BatchRunner::with_invoker(
            BatchConfig::new("flatc", &blocker, "--cpp"),
            invoker.clone(),
        );

        let err = runner
            .run(&[SchemaInput::new("/schemas/a.fbs")])
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::OutputDirectory { .. }));
        assert!(invoker.calls().is_empty());
    }
}
