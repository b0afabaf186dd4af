//! Test helpers shared across the workspace.
//!
//! Enabled with the `testing` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// Layer that counts error-level events.
///
/// Installed as the thread's default subscriber, so tests must run on a
/// current-thread runtime (the `#[tokio::test]` default) for spawned tasks to
/// be observed.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicUsize>,
}

impl ErrorCounter {
    /// Create a counter and install it for the current thread.
    ///
    /// Events are counted until the returned guard is dropped.
    #[must_use]
    pub fn install() -> (Self, DefaultGuard) {
        let counter = Self::default();
        let guard = tracing_subscriber::registry()
            .with(counter.clone())
            .set_default();
        (counter, guard)
    }

    /// Number of error-level events seen so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }
}
