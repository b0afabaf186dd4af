//! Pipeline wiring: watcher, extractor and dispatcher joined by bounded
//! channels and driven by one cancellation token.

use sqlproc_core::{Error, EventSource, Result, Sink, Statement};
use sqlproc_export::Dispatcher;
use sqlproc_extract::{Extractor, ExtractorConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::source::NotifySource;
use crate::watcher::{WatchedDirectory, Watcher};

/// Configuration for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of the event, file and statement channels
    pub channel_capacity: usize,
    /// Debounce window for filesystem notifications
    pub debounce: Duration,
    /// Extractor settings
    pub extractor: ExtractorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            debounce: Duration::from_millis(100),
            extractor: ExtractorConfig::default(),
        }
    }
}

/// The three stages of a running sqlproc, ready to be started.
pub struct Pipeline {
    watcher: Watcher,
    extractor: Extractor,
    dispatcher: Dispatcher,
    statement_rx: mpsc::Receiver<Statement>,
}

impl Pipeline {
    /// Build a pipeline watching directories through OS notifications.
    ///
    /// # Errors
    ///
    /// Returns the watcher's configuration errors, or [`Error::Watch`] if the
    /// notification backend cannot be started.
    pub fn new<S: AsRef<str>>(
        directives: &[S],
        sinks: Vec<Arc<dyn Sink>>,
        config: PipelineConfig,
    ) -> Result<Self> {
        if directives.is_empty() {
            return Err(Error::NoDirectivesProvided);
        }
        let source = NotifySource::new(config.debounce, config.channel_capacity)?;
        Self::with_source(directives, Box::new(source), sinks, config)
    }

    /// Build a pipeline over an arbitrary event source.
    pub fn with_source<S: AsRef<str>>(
        directives: &[S],
        source: Box<dyn EventSource>,
        sinks: Vec<Arc<dyn Sink>>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let capacity = config.channel_capacity.max(1);
        let (file_tx, file_rx) = mpsc::channel(capacity);
        let (statement_tx, statement_rx) = mpsc::channel(capacity);

        let watcher = Watcher::new(directives, source, file_tx)?;
        let extractor = Extractor::new(file_rx, statement_tx).with_config(config.extractor);
        let dispatcher = Dispatcher::new(sinks);

        Ok(Self {
            watcher,
            extractor,
            dispatcher,
            statement_rx,
        })
    }

    /// Directories the pipeline watches.
    pub fn directories(&self) -> &[WatchedDirectory] {
        self.watcher.directories()
    }

    /// Run every stage until `cancel` fires or the event source is exhausted.
    ///
    /// The watcher is closed when it stops, which lets the downstream stages
    /// drain what is already in flight and exit.
    ///
    /// # Errors
    ///
    /// Returns the first error from releasing the watches, or
    /// [`Error::Other`] if a stage panicked.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let Self {
            mut watcher,
            extractor,
            dispatcher,
            statement_rx,
        } = self;

        info!(
            directories = watcher.directories().len(),
            sinks = dispatcher.sinks().len(),
            "pipeline started"
        );

        let watcher_task = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                watcher.run(cancel).await;
                watcher.close()
            }
        });
        let extractor_task = tokio::spawn(extractor.run(cancel.clone()));
        let dispatcher_task = tokio::spawn(dispatcher.run(statement_rx, cancel));

        let (watched, extracted, dispatched) =
            tokio::join!(watcher_task, extractor_task, dispatcher_task);

        extracted.map_err(|e| Error::Other(format!("extractor task failed: {e}")))?;
        dispatched.map_err(|e| Error::Other(format!("dispatcher task failed: {e}")))?;
        watched.map_err(|e| Error::Other(format!("watcher task failed: {e}")))??;

        debug!("pipeline stopped");
        Ok(())
    }
}
