//! In-memory sink for tests and embedding.
//!
//! [`MemorySink`] keeps every exported statement in memory so callers can
//! inspect what reached the end of the pipeline.

use async_trait::async_trait;
use sqlproc_core::{ExportError, Sink, Statement};
use tokio::sync::RwLock;
use tracing::trace;

/// Sink that captures statements in memory.
///
/// # Example
///
/// ```rust
/// use sqlproc_core::{Sink, SqlFile, SqlType, Statement};
/// use sqlproc_export::MemorySink;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = MemorySink::new();
/// let statement = Statement {
///     file: SqlFile::new("a.sql", SqlType::Postgres),
///     content: "SELECT 1".to_string(),
///     line_num: 1,
/// };
/// sink.export(&statement).await?;
/// assert_eq!(sink.len().await, 1);
/// # Ok(())
/// # }
/// ```
pub struct MemorySink {
    name: String,
    statements: RwLock<Vec<Statement>>,
}

impl MemorySink {
    /// Create an empty sink named `memory`.
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create an empty sink with a custom name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the captured statements, in export order.
    pub async fn statements(&self) -> Vec<Statement> {
        self.statements.read().await.clone()
    }

    /// Number of captured statements.
    pub async fn len(&self) -> usize {
        self.statements.read().await.len()
    }

    /// Whether nothing has been captured.
    pub async fn is_empty(&self) -> bool {
        self.statements.read().await.is_empty()
    }

    /// Drop everything captured so far.
    pub async fn clear(&self) {
        self.statements.write().await.clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn export(&self, statement: &Statement) -> Result<(), ExportError> {
        trace!(sink = %self.name, line = statement.line_num, "captured statement");
        self.statements.write().await.push(statement.clone());
        Ok(())
    }

    async fn export_batch(&self, statements: &[Statement]) -> Result<(), ExportError> {
        self.statements.write().await.extend_from_slice(statements);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlproc_core::{SqlFile, SqlType};

    fn statement(content: &str, line_num: usize) -> Statement {
        Statement {
            file: SqlFile::new("memory.sql", SqlType::Postgres),
            content: content.to_string(),
            line_num,
        }
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let sink = MemorySink::new();
        assert!(sink.is_empty().await);
        assert_eq!(sink.name(), "memory");
    }

    #[tokio::test]
    async fn test_export_preserves_order() {
        let sink = MemorySink::new();
        sink.export(&statement("SELECT 1", 1)).await.unwrap();
        sink.export(&statement("SELECT 2", 2)).await.unwrap();

        assert_eq!(
            sink.statements().await,
            vec![statement("SELECT 1", 1), statement("SELECT 2", 2)]
        );
    }

    #[tokio::test]
    async fn test_export_batch_appends() {
        let sink = MemorySink::named("capture");
        sink.export(&statement("SELECT 1", 1)).await.unwrap();
        sink.export_batch(&[statement("SELECT 2", 2), statement("SELECT 3", 3)])
            .await
            .unwrap();

        assert_eq!(sink.name(), "capture");
        assert_eq!(sink.len().await, 3);
        assert_eq!(sink.statements().await[2].content, "SELECT 3");
    }

    #[tokio::test]
    async fn test_clear() {
        let sink = MemorySink::new();
        sink.export(&statement("SELECT 1", 1)).await.unwrap();
        sink.clear().await;
        assert!(sink.is_empty().await);
    }
}
