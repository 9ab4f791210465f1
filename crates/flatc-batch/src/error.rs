//! Error types for flatc-batch

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that stop a batch before any schema is compiled
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch contained no schema files
    #[error("No schema files to compile")]
    NoInputs,

    /// Output directory could not be created
    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while running a single compiler invocation
#[derive(Error, Debug)]
pub enum InvokeError {
    /// The compiler executable could not be located or started
    #[error("Schema compiler executable could not be launched: {executable:?}: {source}")]
    Launch {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed after it was started
    #[error("Failed to collect compiler output: {0}")]
    Io(#[from] std::io::Error),
}

impl InvokeError {
    /// Whether this error means no further invocation can succeed.
    pub fn is_environment(&self) -> bool {
        matches!(self, InvokeError::Launch { .. })
    }
}

/// Errors raised while collecting schema inputs
#[derive(Error, Debug)]
pub enum InputError {
    /// Input path does not exist
    #[error("Schema file not found: {0:?}")]
    NotFound(PathBuf),

    /// List file could not be read
    #[error("Failed to read schema list {path:?}: {source}")]
    ListFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory could not be scanned for schemas
    #[error("Failed to scan directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `BatchConfig`
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Config values are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_is_environment() {
        let err = InvokeError::Launch {
            executable: PathBuf::from("/missing/flatc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_environment());
        assert!(err.to_string().contains("/missing/flatc"));
    }

    #[test]
    fn test_io_error_is_not_environment() {
        let err = InvokeError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!err.is_environment());
    }
}
