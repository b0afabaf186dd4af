//! Dispatcher stage: fans statements out to every registered sink.

use sqlproc_core::{ExportError, Sink, Statement};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info_span};

/// Delivers statements to a fixed, ordered set of sinks.
///
/// Delivery is best effort: a failing sink is logged and skipped, and the
/// statement is neither retried nor withheld from the remaining sinks.
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
    span: Span,
}

impl Dispatcher {
    /// Create a dispatcher over `sinks`, called in the given order.
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Self {
            sinks,
            span: info_span!("dispatcher"),
        }
    }

    /// Set the span log records of this stage are scoped to.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Registered sinks, in delivery order.
    pub fn sinks(&self) -> &[Arc<dyn Sink>] {
        &self.sinks
    }

    /// Deliver one statement to every sink.
    ///
    /// Returns the number of sinks that failed.
    pub async fn dispatch(&self, statement: &Statement) -> usize {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.export(statement).await {
                failures += 1;
                error!(
                    sink = sink.name(),
                    path = %statement.file.path.display(),
                    line = statement.line_num,
                    "failed to export statement: {e}"
                );
            }
        }
        failures
    }

    /// Deliver a batch to every sink's batch export.
    ///
    /// Every sink sees the whole batch; failures from all sinks are joined
    /// into one error.
    pub async fn dispatch_batch(&self, statements: &[Statement]) -> Result<(), ExportError> {
        let mut errors = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.export_batch(statements).await {
                error!(
                    sink = sink.name(),
                    failures = e.count(),
                    "failed to export statement batch: {e}"
                );
                errors.push(e);
            }
        }
        ExportError::join(errors)
    }

    /// Run until cancelled or until the statement channel is closed.
    pub async fn run(self, statement_rx: mpsc::Receiver<Statement>, cancel: CancellationToken) {
        let span = self.span.clone();
        self.run_inner(statement_rx, cancel).instrument(span).await;
    }

    async fn run_inner(
        &self,
        mut statement_rx: mpsc::Receiver<Statement>,
        cancel: CancellationToken,
    ) {
        debug!(sinks = self.sinks.len(), "dispatcher started");

        loop {
            let statement = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                statement = statement_rx.recv() => match statement {
                    Some(statement) => statement,
                    None => break,
                },
            };

            self.dispatch(&statement).await;
        }

        debug!("dispatcher stopped");
    }
}
