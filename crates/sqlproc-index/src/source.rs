//! Filesystem event sources for the watcher.
//!
//! - [`NotifySource`]: OS notifications with debouncing
//! - [`ManualSource`]: events pushed by hand, for tests and embedders

use async_trait::async_trait;
use notify_debouncer_full::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use sqlproc_core::{EventSource, WatchError, WatchEvent, WatchEventKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace};

type EventResult = Result<WatchEvent, WatchError>;

// ============================================================================
// Notify
// ============================================================================

/// Event source backed by the platform's file notification API.
///
/// At most `capacity` events are queued; once full, the debouncer thread
/// waits for the watcher to catch up.
pub struct NotifySource {
    // Dropped before the debouncer so a blocked send is released.
    event_rx: mpsc::Receiver<EventResult>,
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl NotifySource {
    /// Create a new source that batches events over `debounce` and queues at
    /// most `capacity` of them.
    pub fn new(debounce: Duration, capacity: usize) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));

        let debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            handle_debounced_events(result, &event_tx);
        })
        .map_err(|e| WatchError::Init(e.to_string()))?;

        Ok(Self {
            event_rx,
            debouncer,
        })
    }
}

#[async_trait]
impl EventSource for NotifySource {
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        debug!("Starting to watch: {:?}", dir);
        self.debouncer
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Register {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn unwatch(&mut self, dir: &Path) -> Result<(), WatchError> {
        debug!("Stopping watch: {:?}", dir);
        self.debouncer
            .unwatch(dir)
            .map_err(|e| WatchError::Unregister {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn next_event(&mut self) -> Option<EventResult> {
        self.event_rx.recv().await
    }
}

/// Forward one debounced batch, collapsing repeated events for a path.
///
/// Runs on the debouncer's thread and blocks while the channel is full.
fn handle_debounced_events(result: DebounceEventResult, event_tx: &mpsc::Sender<EventResult>) {
    match result {
        Ok(events) => {
            let mut seen = HashSet::new();
            for event in &events {
                let Some(watch_event) = convert_event(event) else {
                    continue;
                };
                if !seen.insert(watch_event.path.clone()) {
                    trace!("Collapsing duplicate event for {:?}", watch_event.path);
                    continue;
                }
                if event_tx.blocking_send(Ok(watch_event)).is_err() {
                    debug!("Event channel closed");
                    return;
                }
            }
        }
        Err(errors) => {
            for error in errors {
                if event_tx
                    .blocking_send(Err(WatchError::Event(error.to_string())))
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

fn convert_event(event: &notify_debouncer_full::DebouncedEvent) -> Option<WatchEvent> {
    use notify_debouncer_full::notify::EventKind;
    use notify_debouncer_full::notify::event::{ModifyKind, RenameMode};

    match &event.kind {
        EventKind::Create(_) => Some(WatchEvent::new(
            event.paths.first()?.clone(),
            WatchEventKind::Created,
        )),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(WatchEvent::new(
            event.paths.first()?.clone(),
            WatchEventKind::Modified,
        )),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(WatchEvent::new(
            event.paths.first()?.clone(),
            WatchEventKind::MovedIn,
        )),
        // Rename with both ends known: the destination is the second path.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Some(WatchEvent::new(
            event.paths.get(1)?.clone(),
            WatchEventKind::MovedIn,
        )),
        _ => None,
    }
}

// ============================================================================
// Manual
// ============================================================================

/// Event source fed through a [`ManualHandle`].
///
/// The source is exhausted once every handle has been dropped.
pub struct ManualSource {
    event_rx: mpsc::UnboundedReceiver<EventResult>,
    watched: Arc<Mutex<HashSet<PathBuf>>>,
}

/// Sending side of a [`ManualSource`].
#[derive(Clone)]
pub struct ManualHandle {
    event_tx: mpsc::UnboundedSender<EventResult>,
    watched: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ManualSource {
    /// Create a source and the handle that feeds it.
    #[must_use]
    pub fn new() -> (Self, ManualHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let watched = Arc::new(Mutex::new(HashSet::new()));
        (
            Self {
                event_rx,
                watched: Arc::clone(&watched),
            },
            ManualHandle { event_tx, watched },
        )
    }
}

#[async_trait]
impl EventSource for ManualSource {
    fn watch(&mut self, dir: &Path) -> Result<(), WatchError> {
        let mut watched = self.watched.lock().map_err(|_| WatchError::Register {
            path: dir.to_path_buf(),
            reason: "watch set poisoned".to_string(),
        })?;
        watched.insert(dir.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, dir: &Path) -> Result<(), WatchError> {
        let mut watched = self.watched.lock().map_err(|_| WatchError::Unregister {
            path: dir.to_path_buf(),
            reason: "watch set poisoned".to_string(),
        })?;
        if watched.remove(dir) {
            Ok(())
        } else {
            Err(WatchError::Unregister {
                path: dir.to_path_buf(),
                reason: "not watched".to_string(),
            })
        }
    }

    async fn next_event(&mut self) -> Option<EventResult> {
        self.event_rx.recv().await
    }
}

impl ManualHandle {
    /// Report an event. Returns `false` if the source is gone.
    pub fn send(&self, event: WatchEvent) -> bool {
        self.event_tx.send(Ok(event)).is_ok()
    }

    /// Report an event failure. Returns `false` if the source is gone.
    pub fn send_error(&self, error: WatchError) -> bool {
        self.event_tx.send(Err(error)).is_ok()
    }

    /// Directories currently registered with the source.
    #[must_use]
    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
