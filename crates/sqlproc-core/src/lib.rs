//! # sqlproc-core
//!
//! Core types and traits for sqlproc, a pipeline that watches directories for
//! SQL scripts, splits them into statements and delivers the statements to
//! pluggable sinks.
//!
//! ## Architecture
//!
//! ```text
//! directories → Watcher → SqlFile → Extractor → Statement → Dispatcher → Sinks
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlType`] | SQL dialect a directory is bound to |
//! | [`SqlFile`] | A script file observed in a watched directory |
//! | [`Statement`] | One statement with its source location |
//! | [`DirectoryDirective`] | `"<directory>:<type>"` configuration unit |
//! | [`WatchEvent`] | Filesystem event reported by an [`EventSource`] |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Sink`] | Export statements to a destination |
//! | [`EventSource`] | Report file creation/write events for directories |
//!
//! ## Feature Flags
//!
//! - `testing`: exposes [`testing::ErrorCounter`] for asserting on logged errors.
//!
//! ## Related Crates
//!
//! - `sqlproc-extract`: Statement segmentation and the extractor stage
//! - `sqlproc-export`: Dispatcher stage and reference sinks
//! - `sqlproc-index`: Directory watcher and pipeline coordination

pub mod error;
#[cfg(feature = "testing")]
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{Error, ExportError, ExtractError, Result, WatchError};
pub use traits::*;
pub use types::*;
