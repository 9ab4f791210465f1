//! In-memory stand-in for the schema compiler (testing only)
//!
//! `ScriptedInvoker` answers each invocation from a table keyed by schema
//! file name and records every invocation it receives.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::InvokeError;
use crate::invocation::Invocation;
use crate::runner::{CompilerInvoker, InvocationOutput};

/// Stub compiler with per-schema scripted exit codes.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    outcomes: HashMap<String, (i32, String)>,
    io_errors: HashSet<String>,
    missing_executable: bool,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedInvoker {
    /// Compiler that accepts every schema.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Compiler whose executable cannot be launched.
    pub fn missing_executable() -> Self {
        Self {
            missing_executable: true,
            ..Self::default()
        }
    }

    /// Exit with `code` and `stderr` for the schema named `name`.
    pub fn with_exit(mut self, name: &str, code: i32, stderr: &str) -> Self {
        self.outcomes
            .insert(name.to_string(), (code, stderr.to_string()));
        self
    }

    /// Fail to collect output for the schema named `name` after launching.
    pub fn with_io_error(mut self, name: &str) -> Self {
        self.io_errors.insert(name.to_string());
        self
    }

    /// Invocations received so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompilerInvoker for ScriptedInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, InvokeError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if self.missing_executable {
            return Err(InvokeError::Launch {
                executable: invocation.executable.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "program not found"),
            });
        }

        let name = invocation
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.io_errors.contains(&name) {
            return Err(InvokeError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pipe closed",
            )));
        }

        let (code, stderr) = self
            .outcomes
            .get(&name)
            .cloned()
            .unwrap_or((0, String::new()));
        Ok(InvocationOutput::exited(code, "", stderr))
    }
}
