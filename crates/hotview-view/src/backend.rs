//! Filesystem watch backends.
//!
//! A backend accepts subscriptions and delivers change and error
//! notifications through a pair of bounded channels ([`WatchStreams`]).
//! Closing a backend drops its senders, which closes the streams and lets
//! the watch loop run to completion.

use crate::error::{Result, ViewError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, dispatcher, error, info, Dispatch};

/// Subscription side of a watch subsystem.
pub trait WatchBackend: Send {
    /// Start observing a file. Subscribing twice is a no-op.
    fn subscribe(&mut self, path: &Path) -> Result<()>;

    /// Release every subscription and close the event streams.
    /// Calling it again does nothing.
    fn close(&mut self);
}

/// Receiving ends of a backend's notification channels.
pub struct WatchStreams {
    /// Changed file paths
    pub changes: mpsc::Receiver<PathBuf>,
    /// Errors reported by the watch subsystem
    pub errors: mpsc::Receiver<ViewError>,
}

struct EventSink {
    changes: mpsc::Sender<PathBuf>,
    errors: mpsc::Sender<ViewError>,
}

/// Senders shared between a backend and its producers. Taking the sink
/// out closes the streams once in-flight sends finish.
type SharedSink = Arc<Mutex<Option<EventSink>>>;

fn event_channel(buffer: usize) -> (SharedSink, WatchStreams) {
    let (changes_tx, changes) = mpsc::channel(buffer.max(1));
    let (errors_tx, errors) = mpsc::channel(buffer.max(1));
    let sink = EventSink {
        changes: changes_tx,
        errors: errors_tx,
    };
    (
        Arc::new(Mutex::new(Some(sink))),
        WatchStreams { changes, errors },
    )
}

/// Backend driven by the platform watcher (inotify, FSEvents, ...).
///
/// Each subscribed file is observed through its parent directory so that
/// editors replacing a file by rename keep producing events for its path.
pub struct NotifyBackend {
    watcher: Option<RecommendedWatcher>,
    sink: SharedSink,
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl NotifyBackend {
    /// Create a backend and its event streams. The platform watcher thread
    /// logs to the dispatcher that is the default here.
    pub fn new(buffer: usize) -> Result<(Self, WatchStreams)> {
        let (sink, streams) = event_channel(buffer);
        let handler_sink = sink.clone();
        let logger = dispatcher::get_default(Dispatch::clone);

        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // Clone out of the lock so a full channel never blocks close().
            let (changes, errors) = match handler_sink.lock().as_ref() {
                Some(sink) => (sink.changes.clone(), sink.errors.clone()),
                None => return,
            };
            let _guard = dispatcher::set_default(&logger);
            match result {
                Ok(event) => {
                    for change in convert_event(&event) {
                        if let Err(e) = changes.blocking_send(change) {
                            debug!(error = %e, "Change stream closed");
                        }
                    }
                }
                Err(e) => {
                    if let Err(e) = errors.blocking_send(ViewError::from(e)) {
                        error!(error = %e, "Failed to send watcher error");
                    }
                }
            }
        })?;

        Ok((
            Self {
                watcher: Some(watcher),
                sink,
                files: HashSet::new(),
                dirs: HashSet::new(),
            },
            streams,
        ))
    }
}

impl WatchBackend for NotifyBackend {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        let watcher = self.watcher.as_mut().ok_or(ViewError::Closed)?;
        if self.files.contains(path) {
            return Ok(());
        }

        let dir = path
            .parent()
            .ok_or_else(|| ViewError::Watcher(format!("no parent directory: {}", path.display())))?;
        if !self.dirs.contains(dir) {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            debug!(dir = ?dir, "Watching directory");
            self.dirs.insert(dir.to_path_buf());
        }

        self.files.insert(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the watcher releases every watch; no per-path unwatch.
        let Some(watcher) = self.watcher.take() else {
            return;
        };
        drop(watcher);
        self.sink.lock().take();
        info!(files = self.files.len(), dirs = self.dirs.len(), "File watcher closed");
        self.files.clear();
        self.dirs.clear();
    }
}

impl Drop for NotifyBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Paths of the files a notify event touches. Creation, modification,
/// rename and removal all mark a path dirty; a rebuild reads the file
/// system as it is at flush time.
fn convert_event(event: &Event) -> Vec<PathBuf> {
    match &event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        EventKind::Access(_) => return Vec::new(), // Ignore access events
        EventKind::Any | EventKind::Other => return Vec::new(),
    }

    event
        .paths
        .iter()
        // Only care about files, not directories
        .filter(|path| !path.is_dir())
        .map(|path| {
            debug!(path = ?path, kind = ?event.kind, "File change detected");
            path.clone()
        })
        .collect()
}

/// In-process backend whose events are injected programmatically.
///
/// Useful when another component already observes the filesystem, and in
/// tests that need deterministic event delivery.
pub struct ChannelBackend {
    sink: SharedSink,
    subscriptions: Vec<PathBuf>,
    closed: bool,
}

/// Producer handle for a [`ChannelBackend`].
#[derive(Clone)]
pub struct EventInjector {
    sink: SharedSink,
}

impl ChannelBackend {
    /// Create a backend, its streams, and an injector feeding them.
    pub fn new(buffer: usize) -> (Self, WatchStreams, EventInjector) {
        let (sink, streams) = event_channel(buffer);
        let injector = EventInjector { sink: sink.clone() };
        (
            Self {
                sink,
                subscriptions: Vec::new(),
                closed: false,
            },
            streams,
            injector,
        )
    }

    /// Paths subscribed so far, in subscription order.
    pub fn subscriptions(&self) -> &[PathBuf] {
        &self.subscriptions
    }
}

impl WatchBackend for ChannelBackend {
    fn subscribe(&mut self, path: &Path) -> Result<()> {
        if self.closed {
            return Err(ViewError::Closed);
        }
        if !self.subscriptions.iter().any(|p| p == path) {
            self.subscriptions.push(path.to_path_buf());
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sink.lock().take();
        self.subscriptions.clear();
    }
}

impl EventInjector {
    /// Deliver a change of `path`. Returns false once the backend is
    /// closed.
    pub async fn modified(&self, path: impl Into<PathBuf>) -> bool {
        let tx = self.sink.lock().as_ref().map(|s| s.changes.clone());
        match tx {
            Some(tx) => tx.send(path.into()).await.is_ok(),
            None => false,
        }
    }

    /// Deliver an error notification. Returns false once the backend is
    /// closed.
    pub async fn error(&self, message: impl Into<String>) -> bool {
        let tx = self.sink.lock().as_ref().map(|s| s.errors.clone());
        match tx {
            Some(tx) => tx.send(ViewError::Watcher(message.into())).await.is_ok(),
            None => false,
        }
    }
}
