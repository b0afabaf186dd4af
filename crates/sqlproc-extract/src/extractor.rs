//! Extractor stage: turns script files into a stream of statements.

use sqlproc_core::{ExtractError, SqlFile, Statement};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info_span};

use crate::splitter::{Segment, StatementSplitter, split_statements};

/// Configuration for the extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum number of files processed at once.
    ///
    /// With more than one, statements of different files may interleave;
    /// statements of one file are always sent in order.
    pub max_concurrent_files: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: 1,
        }
    }
}

/// Reads files received on its input channel and sends their statements on.
pub struct Extractor {
    file_rx: mpsc::Receiver<SqlFile>,
    statement_tx: mpsc::Sender<Statement>,
    config: ExtractorConfig,
    span: Span,
}

impl Extractor {
    /// Create a new extractor between two channels.
    pub fn new(file_rx: mpsc::Receiver<SqlFile>, statement_tx: mpsc::Sender<Statement>) -> Self {
        Self {
            file_rx,
            statement_tx,
            config: ExtractorConfig::default(),
            span: info_span!("extractor"),
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the span log records of this stage are scoped to.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run until cancelled or until the file channel is closed.
    pub async fn run(self, cancel: CancellationToken) {
        let span = self.span.clone();
        self.run_inner(cancel).instrument(span).await;
    }

    async fn run_inner(mut self, cancel: CancellationToken) {
        let limit = self.config.max_concurrent_files.max(1);
        debug!(max_concurrent_files = limit, "extractor started");

        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();

        loop {
            let file = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                file = self.file_rx.recv() => match file {
                    Some(file) => file,
                    None => break,
                },
            };

            if limit == 1 {
                process_file(&file, &self.statement_tx, &cancel).await;
                continue;
            }

            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let statement_tx = self.statement_tx.clone();
            let cancel = cancel.clone();
            tasks.spawn(
                async move {
                    process_file(&file, &statement_tx, &cancel).await;
                    drop(permit);
                }
                .in_current_span(),
            );

            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!("extraction task failed: {e}");
                }
            }
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!("extraction task failed: {e}");
            }
        }

        debug!("extractor stopped");
    }
}

/// Extract and send the statements of one file, logging read failures.
async fn process_file(
    file: &SqlFile,
    statement_tx: &mpsc::Sender<Statement>,
    cancel: &CancellationToken,
) {
    let text = match read_script(&file.path).await {
        Ok(text) => text,
        Err(e) => {
            error!(path = %file.path.display(), "{e}");
            return;
        }
    };

    let mut splitter = StatementSplitter::new(file.sql_type);
    let mut sent = 0usize;

    for (i, line) in text.lines().enumerate() {
        let Some(segment) = splitter.feed(i + 1, line) else {
            continue;
        };

        let statement = into_statement(file, segment);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = statement_tx.send(statement) => {
                if result.is_err() {
                    debug!("statement channel closed");
                    return;
                }
            }
        }
        sent += 1;
    }

    if let Some(fragment) = splitter.finish() {
        debug!(
            path = %file.path.display(),
            line = fragment.line_num,
            "discarding unterminated statement"
        );
    }

    debug!(path = %file.path.display(), statements = sent, "processed sql file");
}

/// Read a whole file and split it into statements.
pub async fn extract_statements(file: &SqlFile) -> Result<Vec<Statement>, ExtractError> {
    let text = read_script(&file.path).await?;
    Ok(split_statements(file.sql_type, &text)
        .into_iter()
        .map(|segment| into_statement(file, segment))
        .collect())
}

async fn read_script(path: &Path) -> Result<String, ExtractError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn into_statement(file: &SqlFile, segment: Segment) -> Statement {
    Statement {
        file: file.clone(),
        content: segment.content,
        line_num: segment.line_num,
    }
}
