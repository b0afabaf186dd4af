//! Error types for sqlproc.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sqlproc operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Watcher constructed without any directory directives
    #[error("no directory directives provided")]
    NoDirectivesProvided,

    /// Directive is not of the `<directory>:<type>` form
    #[error("directory directive has invalid format: {0:?}")]
    InvalidDirective(String),

    /// Text does not name a known SQL dialect
    #[error("unknown sql type: {0:?}")]
    UnknownType(String),

    /// Filesystem watch failed
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// Reading a script file failed
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Exporting statements failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Filesystem watch errors.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to start watcher: {0}")]
    Init(String),

    #[error("failed to watch {path}: {reason}")]
    Register { path: PathBuf, reason: String },

    #[error("failed to unwatch {path}: {reason}")]
    Unregister { path: PathBuf, reason: String },

    #[error("watch event failed: {0}")]
    Event(String),
}

/// Script extraction errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Sink export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export failed: {0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Several exports failed; displayed one per line.
    #[error("{}", JoinedErrors(.0))]
    Batch(Vec<ExportError>),
}

impl ExportError {
    /// Fold a list of failures into a single result.
    ///
    /// No failures is `Ok(())`, a single failure is returned as-is, and
    /// several are wrapped in [`ExportError::Batch`].
    pub fn join(mut errors: Vec<ExportError>) -> std::result::Result<(), ExportError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ExportError::Batch(errors)),
        }
    }

    /// Number of individual failures this error stands for.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            ExportError::Batch(errors) => errors.iter().map(ExportError::count).sum(),
            _ => 1,
        }
    }
}

struct JoinedErrors<'a>(&'a [ExportError]);

impl fmt::Display for JoinedErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Result type alias for sqlproc operations.
pub type Result<T> = std::result::Result<T, Error>;
