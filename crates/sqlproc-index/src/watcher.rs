//! Watcher stage: turns filesystem events into typed script files.

use sqlproc_core::{
    DirectoryDirective, Error, EventSource, Result, SqlFile, SqlType, WatchError, WatchEvent,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, trace, warn};

/// A directory registered with the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedDirectory {
    /// Path as configured
    pub path: PathBuf,
    /// Canonical path, the one registered with the event source
    pub canonical: PathBuf,
    /// Dialect of every file found here
    pub sql_type: SqlType,
}

/// Watches a fixed set of directories and emits a [`SqlFile`] for every
/// regular file that appears directly inside one of them.
pub struct Watcher {
    directories: Vec<WatchedDirectory>,
    source: Box<dyn EventSource>,
    file_tx: mpsc::Sender<SqlFile>,
    span: Span,
}

impl Watcher {
    /// Create a watcher from `"<path>:<type>"` directives.
    ///
    /// Every directive is validated before any directory is registered.
    ///
    /// # Errors
    ///
    /// - [`Error::NoDirectivesProvided`] for an empty list
    /// - [`Error::InvalidDirective`] or [`Error::UnknownType`] for a bad directive
    /// - [`Error::Watch`] if a directory cannot be registered
    pub fn new<S: AsRef<str>>(
        directives: &[S],
        source: Box<dyn EventSource>,
        file_tx: mpsc::Sender<SqlFile>,
    ) -> Result<Self> {
        let directives = directives
            .iter()
            .map(|d| d.as_ref().parse::<DirectoryDirective>())
            .collect::<Result<Vec<_>>>()?;
        Self::from_directives(directives, source, file_tx)
    }

    /// Create a watcher from already parsed directives.
    pub fn from_directives(
        directives: Vec<DirectoryDirective>,
        mut source: Box<dyn EventSource>,
        file_tx: mpsc::Sender<SqlFile>,
    ) -> Result<Self> {
        if directives.is_empty() {
            return Err(Error::NoDirectivesProvided);
        }

        let mut directories: Vec<WatchedDirectory> = Vec::with_capacity(directives.len());
        for directive in directives {
            let canonical = canonical_dir(&directive.path)?;
            if let Some(existing) = directories.iter().find(|d| d.canonical == canonical) {
                warn!(
                    path = %directive.path.display(),
                    "directory already watched as {}, ignoring",
                    existing.sql_type
                );
                continue;
            }
            directories.push(WatchedDirectory {
                path: directive.path,
                canonical,
                sql_type: directive.sql_type,
            });
        }

        for (i, dir) in directories.iter().enumerate() {
            if let Err(e) = source.watch(&dir.canonical) {
                for registered in &directories[..i] {
                    let _ = source.unwatch(&registered.canonical);
                }
                return Err(e.into());
            }
            info!(path = %dir.path.display(), sql_type = %dir.sql_type, "watching directory");
        }

        Ok(Self {
            directories,
            source,
            file_tx,
            span: info_span!("watcher"),
        })
    }

    /// Set the span log records of this stage are scoped to.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Registered directories, in directive order.
    pub fn directories(&self) -> &[WatchedDirectory] {
        &self.directories
    }

    /// Run until cancelled, until the event source is exhausted, or until
    /// the file channel is closed.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let span = self.span.clone();
        self.run_inner(cancel).instrument(span).await;
    }

    async fn run_inner(&mut self, cancel: CancellationToken) {
        debug!(directories = self.directories.len(), "watcher started");

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = self.source.next_event() => match event {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        error!("{e}");
                        continue;
                    }
                    None => {
                        debug!("event source exhausted");
                        break;
                    }
                },
            };

            let Some(file) = resolve(&self.directories, &event) else {
                trace!(path = %event.path.display(), "event outside watched directories");
                continue;
            };

            match tokio::fs::metadata(&event.path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => {
                    debug!(path = %event.path.display(), "skipping non-regular file");
                    continue;
                }
                Err(e) => {
                    debug!(path = %event.path.display(), "skipping vanished file: {e}");
                    continue;
                }
            }

            debug!(path = %file.path.display(), kind = ?event.kind, "new script file");
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.file_tx.send(file) => if result.is_err() {
                    debug!("file channel closed");
                    break;
                },
            }
        }

        debug!("watcher stopped");
    }

    /// Release every watch and the event source.
    ///
    /// All directories are unregistered even if some fail; the first failure
    /// is returned.
    pub fn close(mut self) -> std::result::Result<(), WatchError> {
        let mut first_error = None;
        for dir in &self.directories {
            if let Err(e) = self.source.unwatch(&dir.canonical) {
                warn!(path = %dir.path.display(), "{e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn canonical_dir(path: &Path) -> std::result::Result<PathBuf, WatchError> {
    let register_error = |reason: String| WatchError::Register {
        path: path.to_path_buf(),
        reason,
    };

    let canonical = std::fs::canonicalize(path).map_err(|e| register_error(e.to_string()))?;
    if !canonical.is_dir() {
        return Err(register_error("not a directory".to_string()));
    }
    Ok(canonical)
}

/// Map an event to the file it announces, if it lies directly inside a
/// watched directory.
fn resolve(directories: &[WatchedDirectory], event: &WatchEvent) -> Option<SqlFile> {
    let parent = event.path.parent()?;
    let name = event.path.file_name()?;
    directories
        .iter()
        .find(|d| parent == d.canonical || parent == d.path)
        .map(|d| SqlFile::new(d.path.join(name), d.sql_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ManualHandle, ManualSource};
    use sqlproc_core::WatchEventKind;
    use sqlproc_core::testing::ErrorCounter;
    use std::time::Duration;
    use tempfile::TempDir;

    fn directive(dir: &TempDir, sql_type: &str) -> String {
        format!("{}:{sql_type}", dir.path().display())
    }

    fn manual_watcher(
        directives: &[String],
        capacity: usize,
    ) -> (Watcher, ManualHandle, mpsc::Receiver<SqlFile>) {
        let (source, handle) = ManualSource::new();
        let (file_tx, file_rx) = mpsc::channel(capacity);
        let watcher = Watcher::new(directives, Box::new(source), file_tx).unwrap();
        (watcher, handle, file_rx)
    }

    fn created(path: impl Into<PathBuf>) -> WatchEvent {
        WatchEvent::new(path, WatchEventKind::Created)
    }

    // ========== Construction Tests ==========

    #[test]
    fn test_no_directives() {
        let (source, _handle) = ManualSource::new();
        let (file_tx, _file_rx) = mpsc::channel(1);
        let directives: &[&str] = &[];

        let result = Watcher::new(directives, Box::new(source), file_tx);
        assert!(matches!(result, Err(Error::NoDirectivesProvided)));
    }

    #[test]
    fn test_invalid_directive() {
        let dir = tempfile::tempdir().unwrap();
        let (source, handle) = ManualSource::new();
        let (file_tx, _file_rx) = mpsc::channel(1);

        let directives = [directive(&dir, "postgres"), "/path/to/dir".to_string()];
        let result = Watcher::new(&directives, Box::new(source), file_tx);

        assert!(matches!(result, Err(Error::InvalidDirective(ref d)) if d == "/path/to/dir"));
        assert!(handle.watched().is_empty());
    }

    #[test]
    fn test_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let (source, _handle) = ManualSource::new();
        let (file_tx, _file_rx) = mpsc::channel(1);

        let result = Watcher::new(&[directive(&dir, "oracle")], Box::new(source), file_tx);
        assert!(matches!(result, Err(Error::UnknownType(ref t)) if t == "oracle"));
    }

    #[test]
    fn test_missing_directory() {
        let (source, _handle) = ManualSource::new();
        let (file_tx, _file_rx) = mpsc::channel(1);

        let result = Watcher::new(
            &["/definitely/not/a/real/dir:postgres"],
            Box::new(source),
            file_tx,
        );
        assert!(matches!(
            result,
            Err(Error::Watch(WatchError::Register { .. }))
        ));
    }

    #[test]
    fn test_registers_every_directory() {
        let pg = tempfile::tempdir().unwrap();
        let my = tempfile::tempdir().unwrap();
        let (watcher, handle, _rx) =
            manual_watcher(&[directive(&pg, "postgres"), directive(&my, "mysql")], 1);

        let mut watched = handle.watched();
        watched.sort();
        let mut expected = vec![
            pg.path().canonicalize().unwrap(),
            my.path().canonicalize().unwrap(),
        ];
        expected.sort();
        assert_eq!(watched, expected);

        let types: Vec<_> = watcher.directories().iter().map(|d| d.sql_type).collect();
        assert_eq!(types, vec![SqlType::Postgres, SqlType::MySql]);
    }

    #[test]
    fn test_duplicate_directory_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, handle, _rx) =
            manual_watcher(&[directive(&dir, "sqlite"), directive(&dir, "mysql")], 1);

        assert_eq!(watcher.directories().len(), 1);
        assert_eq!(watcher.directories()[0].sql_type, SqlType::Sqlite);
        assert_eq!(handle.watched().len(), 1);
    }

    // ========== Run Tests ==========

    #[tokio::test]
    async fn test_emits_file_with_directory_type() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, handle, mut file_rx) = manual_watcher(&[directive(&dir, "postgres")], 4);

        let path = dir.path().join("users.sql");
        std::fs::write(&path, "SELECT 1;\n").unwrap();
        handle.send(created(&path));
        drop(handle);

        watcher.run(CancellationToken::new()).await;

        let file = file_rx.recv().await.unwrap();
        assert_eq!(file, SqlFile::new(path, SqlType::Postgres));
        assert!(file_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_files_from_several_directories() {
        let pg = tempfile::tempdir().unwrap();
        let lite = tempfile::tempdir().unwrap();
        let (mut watcher, handle, mut file_rx) = manual_watcher(
            &[directive(&pg, "postgres"), directive(&lite, "sqlite")],
            4,
        );

        let a = pg.path().join("a.sql");
        let b = lite.path().join("b.sql");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();
        handle.send(created(&a));
        handle.send(WatchEvent::new(
            lite.path().canonicalize().unwrap().join("b.sql"),
            WatchEventKind::MovedIn,
        ));
        drop(handle);

        watcher.run(CancellationToken::new()).await;

        assert_eq!(
            file_rx.recv().await.unwrap(),
            SqlFile::new(a, SqlType::Postgres)
        );
        assert_eq!(
            file_rx.recv().await.unwrap(),
            SqlFile::new(b, SqlType::Sqlite)
        );
    }

    #[tokio::test]
    async fn test_ignores_unrelated_events() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let (mut watcher, handle, mut file_rx) = manual_watcher(&[directive(&dir, "mysql")], 4);

        let outside = elsewhere.path().join("outside.sql");
        std::fs::write(&outside, "").unwrap();
        let subdir = dir.path().join("nested");
        std::fs::create_dir(&subdir).unwrap();
        let nested = subdir.join("deep.sql");
        std::fs::write(&nested, "").unwrap();

        handle.send(created(&outside));
        handle.send(created(&subdir));
        handle.send(created(&nested));
        handle.send(created(dir.path().join("gone.sql")));
        drop(handle);

        watcher.run(CancellationToken::new()).await;
        drop(watcher);
        assert!(file_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_event_error_is_logged_and_skipped() {
        let (errors, _guard) = ErrorCounter::install();
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, handle, mut file_rx) = manual_watcher(&[directive(&dir, "postgres")], 4);

        let path = dir.path().join("after.sql");
        std::fs::write(&path, "").unwrap();
        handle.send_error(WatchError::Event("queue overflow".to_string()));
        handle.send(created(&path));
        drop(handle);

        watcher.run(CancellationToken::new()).await;

        assert_eq!(errors.count(), 1);
        assert_eq!(file_rx.recv().await.unwrap().path, path);
    }

    #[tokio::test]
    async fn test_stops_when_file_channel_closed() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, handle, file_rx) = manual_watcher(&[directive(&dir, "postgres")], 1);
        drop(file_rx);

        let path = dir.path().join("a.sql");
        std::fs::write(&path, "").unwrap();
        handle.send(created(&path));

        tokio::time::timeout(Duration::from_secs(5), watcher.run(CancellationToken::new()))
            .await
            .expect("watcher did not stop");
    }

    #[tokio::test]
    async fn test_cancel_while_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, _handle, _file_rx) = manual_watcher(&[directive(&dir, "postgres")], 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), watcher.run(cancel))
            .await
            .expect("watcher ignored cancellation");
    }

    #[tokio::test]
    async fn test_cancel_abandons_blocked_send() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, handle, mut file_rx) = manual_watcher(&[directive(&dir, "postgres")], 1);

        for name in ["a.sql", "b.sql"] {
            let path = dir.path().join(name);
            std::fs::write(&path, "").unwrap();
            handle.send(created(&path));
        }

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), watcher.run(cancel))
            .await
            .expect("blocked send was not abandoned");

        assert!(file_rx.recv().await.unwrap().path.ends_with("a.sql"));
        drop(watcher);
        assert!(file_rx.recv().await.is_none());
    }

    // ========== Close Tests ==========

    #[test]
    fn test_close_unwatches_every_directory() {
        let pg = tempfile::tempdir().unwrap();
        let my = tempfile::tempdir().unwrap();
        let (watcher, handle, _rx) =
            manual_watcher(&[directive(&pg, "postgres"), directive(&my, "mysql")], 1);

        watcher.close().unwrap();
        assert!(handle.watched().is_empty());
    }

    #[tokio::test]
    async fn test_close_drops_file_sender() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _handle, mut file_rx) = manual_watcher(&[directive(&dir, "postgres")], 1);

        watcher.close().unwrap();
        assert!(file_rx.recv().await.is_none());
    }
}
