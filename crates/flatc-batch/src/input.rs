//! Sources of schema files for a batch.

use crate::error::InputError;
use crate::invocation::SchemaInput;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Schema file extension picked up when a directory is given.
pub const SCHEMA_EXTENSION: &str = "fbs";

/// Something that yields the ordered list of schemas to compile.
pub trait InputSource {
    fn collect(&self) -> Result<Vec<SchemaInput>, InputError>;
}

/// Explicit paths, e.g. command-line arguments.
///
/// Directories expand to the `.fbs` files directly inside them, sorted by name.
#[derive(Debug, Clone, Default)]
pub struct PathListSource {
    paths: Vec<PathBuf>,
    base: Option<PathBuf>,
}

impl PathListSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, base: None }
    }

    /// Resolve relative paths against `base` instead of the working directory.
    pub fn relative_to(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }
}

impl InputSource for PathListSource {
    fn collect(&self) -> Result<Vec<SchemaInput>, InputError> {
        let base = match &self.base {
            Some(base) => base.clone(),
            None => std::env::current_dir().unwrap_or_default(),
        };

        let mut seen = HashSet::new();
        let mut inputs = Vec::new();

        for raw in &self.paths {
            let path = absolutize(&base, raw);
            if path.is_dir() {
                for schema in schemas_in_dir(&path)? {
                    if seen.insert(schema.clone()) {
                        inputs.push(SchemaInput::new(schema));
                    }
                }
            } else if path.exists() {
                if seen.insert(path.clone()) {
                    inputs.push(SchemaInput::new(path));
                }
            } else {
                return Err(InputError::NotFound(path));
            }
        }

        debug!(count = inputs.len(), "collected schema inputs");
        Ok(inputs)
    }
}

/// Text file listing one schema path per line.
///
/// Blank lines and `#` comments are skipped. Relative entries resolve
/// against the list file's directory.
#[derive(Debug, Clone)]
pub struct ListFileSource {
    path: PathBuf,
}

impl ListFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl InputSource for ListFileSource {
    fn collect(&self) -> Result<Vec<SchemaInput>, InputError> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|source| InputError::ListFile {
                path: self.path.clone(),
                source,
            })?;

        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from)
            .collect();

        let base = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let base = absolutize(&std::env::current_dir().unwrap_or_default(), &base);

        PathListSource::new(entries).relative_to(base).collect()
    }
}

/// Several sources concatenated in order, duplicates dropped.
#[derive(Default)]
pub struct ChainedSource {
    sources: Vec<Box<dyn InputSource>>,
}

impl ChainedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, source: impl InputSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl InputSource for ChainedSource {
    fn collect(&self) -> Result<Vec<SchemaInput>, InputError> {
        let mut seen = HashSet::new();
        let mut inputs = Vec::new();
        for source in &self.sources {
            for input in source.collect()? {
                if seen.insert(input.clone()) {
                    inputs.push(input);
                }
            }
        }
        Ok(inputs)
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn schemas_in_dir(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let entries = std::fs::read_dir(dir).map_err(|source| InputError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut schemas = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| InputError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SCHEMA_EXTENSION))
        {
            schemas.push(path);
        }
    }
    schemas.sort();
    Ok(schemas)
}
