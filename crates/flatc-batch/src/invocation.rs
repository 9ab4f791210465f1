//! Schema inputs and per-schema compiler invocations.

use crate::config::BatchConfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// A schema file selected for compilation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SchemaInput {
    path: PathBuf,
}

impl SchemaInput {
    /// Wrap a path. Existence is checked by the input source, not here.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Full path of the schema file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used when reporting (e.g. `monster.fbs`).
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Directory handed to the compiler as `-I`.
    pub fn include_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl fmt::Display for SchemaInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// One compiler run against one schema file.
///
/// Renders as `<exe> <generator> -o <output> -I <include> <input>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Compiler executable.
    pub executable: PathBuf,

    /// Generator flag (fixed for the batch).
    pub generator_flag: String,

    /// Output directory (fixed for the batch).
    pub output_dir: PathBuf,

    /// Include directory (parent of `input`).
    pub include_dir: PathBuf,

    /// Schema file to compile.
    pub input: PathBuf,

    /// Timeout in seconds (0 = none).
    pub timeout_secs: u64,
}

impl Invocation {
    /// Build the invocation for `input` under `config`.
    pub fn for_input(config: &BatchConfig, input: &SchemaInput) -> Self {
        Self {
            executable: config.executable_path.clone(),
            generator_flag: config.generator_flag.clone(),
            output_dir: config.output_directory.clone(),
            include_dir: input.include_dir(),
            input: input.path().to_path_buf(),
            timeout_secs: config.timeout_secs,
        }
    }

    /// Arguments after the executable, in the order the compiler expects.
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from(&self.generator_flag),
            OsString::from("-o"),
            self.output_dir.clone().into_os_string(),
            OsString::from("-I"),
            self.include_dir.clone().into_os_string(),
            self.input.clone().into_os_string(),
        ]
    }

    /// Printable command line for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.clone().into_os_string())
            .chain(self.args())
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
