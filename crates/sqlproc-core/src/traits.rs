//! Core traits for sqlproc components.
//!
//! - [`Sink`]: Destination for extracted statements
//! - [`EventSource`]: Supplier of filesystem events for watched directories
//!
//! Both are object safe so the pipeline can hold them as trait objects and
//! tests can substitute in-memory implementations.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{ExportError, WatchError};
use crate::types::{Statement, WatchEvent};

// ============================================================================
// Sinks
// ============================================================================

/// Destination for extracted statements.
///
/// Implementations are called sequentially by a single dispatcher, but must
/// do their own synchronization if shared between dispatchers.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Name used in log records.
    fn name(&self) -> &str;

    /// Export a single statement.
    async fn export(&self, statement: &Statement) -> Result<(), ExportError>;

    /// Export statements in order.
    ///
    /// Every statement is attempted; failures are joined into one error
    /// instead of stopping at the first.
    async fn export_batch(&self, statements: &[Statement]) -> Result<(), ExportError> {
        let mut errors = Vec::new();
        for statement in statements {
            if let Err(e) = self.export(statement).await {
                errors.push(e);
            }
        }
        ExportError::join(errors)
    }
}

// ============================================================================
// Filesystem Events
// ============================================================================

/// Supplier of filesystem events for a set of directories.
#[async_trait]
pub trait EventSource: Send {
    /// Start reporting events for files directly inside `dir`.
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError>;

    /// Stop reporting events for `dir`.
    fn unwatch(&mut self, dir: &Path) -> Result<(), WatchError>;

    /// Wait for the next event.
    ///
    /// Returns `None` once the source is exhausted. Must be cancel safe.
    async fn next_event(&mut self) -> Option<Result<WatchEvent, WatchError>>;
}
