//! Core types for sqlproc.
//!
//! This module contains the value types that flow through the pipeline:
//!
//! ## Dialects
//! - [`SqlType`]: The SQL dialect a watched directory is bound to
//!
//! ## Pipeline Records
//! - [`SqlFile`]: A script file observed in a watched directory
//! - [`Statement`]: One SQL statement extracted from a [`SqlFile`]
//!
//! ## Watching
//! - [`DirectoryDirective`]: A `"<directory>:<type>"` configuration unit
//! - [`WatchEvent`]: A filesystem event reported by an event source

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// Dialects
// ============================================================================

/// SQL dialect of a script file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlType {
    /// `PostgreSQL`
    Postgres,
    /// `MySQL` / `MariaDB`
    MySql,
    /// `SQLite`
    Sqlite,
}

impl SqlType {
    /// Every known dialect, in declaration order.
    pub const ALL: [SqlType; 3] = [SqlType::Postgres, SqlType::MySql, SqlType::Sqlite];

    /// The literal used for this dialect in directives and output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Postgres => "postgres",
            SqlType::MySql => "mysql",
            SqlType::Sqlite => "sqlite",
        }
    }

    /// Tokens that start a line comment in this dialect.
    #[must_use]
    pub fn line_comment_markers(&self) -> &'static [&'static str] {
        match self {
            SqlType::Postgres | SqlType::Sqlite => &["--"],
            SqlType::MySql => &["--", "#"],
        }
    }
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SqlType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownType(s.to_string()))
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Pipeline Records
// ============================================================================

/// A script file observed in a watched directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SqlFile {
    /// Path to the file
    pub path: PathBuf,
    /// Dialect of the directory the file was found in
    #[serde(rename = "type")]
    pub sql_type: SqlType,
}

impl SqlFile {
    /// Create a new file record.
    pub fn new(path: impl Into<PathBuf>, sql_type: SqlType) -> Self {
        Self {
            path: path.into(),
            sql_type,
        }
    }
}

/// One SQL statement extracted from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// File the statement was read from
    pub file: SqlFile,
    /// Statement text without its terminator; lines joined with `\n`
    pub content: String,
    /// 1-based line number of the first content line
    pub line_num: usize,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} [{}] [{}]",
            self.file.path.display(),
            self.line_num,
            self.file.sql_type,
            self.content
        )
    }
}

// ============================================================================
// Watching
// ============================================================================

/// Number of `:`-separated parts in a directory directive.
const DIRECTIVE_PART_COUNT: usize = 2;

/// Binds a directory to the dialect of the scripts placed in it.
///
/// Parsed from the `"<directory>:<type>"` form, e.g. `/var/sql/pg:postgres`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryDirective {
    /// Directory to watch, as configured
    pub path: PathBuf,
    /// Dialect of files found in the directory
    pub sql_type: SqlType,
}

impl FromStr for DirectoryDirective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != DIRECTIVE_PART_COUNT || parts[0].is_empty() {
            return Err(Error::InvalidDirective(s.to_string()));
        }

        Ok(Self {
            path: PathBuf::from(parts[0]),
            sql_type: parts[1].parse()?,
        })
    }
}

impl fmt::Display for DirectoryDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.sql_type)
    }
}

/// Kind of filesystem change reported by an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    /// A file was created
    Created,
    /// File content was written
    Modified,
    /// A file was renamed or moved into the directory
    MovedIn,
}

/// A filesystem event reported by an event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path the event refers to
    pub path: PathBuf,
    /// What happened
    pub kind: WatchEventKind,
}

impl WatchEvent {
    /// Create a new event.
    pub fn new(path: impl Into<PathBuf>, kind: WatchEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
