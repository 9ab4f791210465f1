//! Batch configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generator flag used when none is configured.
pub const DEFAULT_GENERATOR: &str = "--cpp";

/// Output directory used when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "compiled";

/// File name of the compiler executable.
#[cfg(windows)]
pub const FLATC_EXE: &str = "flatc.exe";
#[cfg(not(windows))]
pub const FLATC_EXE: &str = "flatc";

/// Configuration shared by every invocation in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Path to the schema compiler executable.
    pub executable_path: PathBuf,

    /// Directory the compiler writes generated code into.
    pub output_directory: PathBuf,

    /// Language generator flag passed to the compiler (e.g. `--cpp`).
    pub generator_flag: String,

    /// Per-invocation timeout in seconds (0 = wait indefinitely).
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::defaults_for(exe_dir.as_deref())
    }
}

impl BatchConfig {
    /// Create a configuration with no timeout.
    pub fn new(
        executable_path: impl Into<PathBuf>,
        output_directory: impl Into<PathBuf>,
        generator_flag: impl Into<String>,
    ) -> Self {
        Self {
            executable_path: executable_path.into(),
            output_directory: output_directory.into(),
            generator_flag: generator_flag.into(),
            timeout_secs: 0,
        }
    }

    /// Defaults relative to the directory holding the running binary.
    ///
    /// When `flatc` sits in `tool_dir` the tool directory is self-contained:
    /// that `flatc` is used and output goes to `tool_dir/compiled`. Otherwise
    /// `flatc` comes from PATH and output goes to `compiled` under the
    /// working directory.
    pub fn defaults_for(tool_dir: Option<&Path>) -> Self {
        let bundled = tool_dir
            .map(|dir| dir.join(FLATC_EXE))
            .filter(|candidate| candidate.is_file());

        let (executable_path, output_directory) = match (bundled, tool_dir) {
            (Some(exe), Some(dir)) => (exe, dir.join(DEFAULT_OUTPUT_DIR)),
            _ => (PathBuf::from(FLATC_EXE), PathBuf::from(DEFAULT_OUTPUT_DIR)),
        };

        Self {
            executable_path,
            output_directory,
            generator_flag: DEFAULT_GENERATOR.to_string(),
            timeout_secs: 0,
        }
    }

    /// Set the per-invocation timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Load a configuration from a JSON file.
    ///
    /// Missing fields take their defaults. Relative paths inside the file
    /// are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BatchConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent() {
            config.output_directory = resolve_against(base, &config.output_directory);
            // A bare file name is looked up on PATH, so only anchor real paths.
            if config.executable_path.components().count() > 1 {
                config.executable_path = resolve_against(base, &config.executable_path);
            }
        }

        Ok(config)
    }

    /// Reject configurations no invocation could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executable_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "executable_path must not be empty".to_string(),
            ));
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "output_directory must not be empty".to_string(),
            ));
        }
        if self.generator_flag.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "generator_flag must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() || base.as_os_str().is_empty() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
