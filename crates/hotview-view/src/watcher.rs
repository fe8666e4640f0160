//! View watcher.
//!
//! Keeps registered views in sync with their source files. Change
//! notifications are collected into a dirty set and acted on once per
//! debounce window; each window rebuilds the affected views and publishes
//! the results atomically.
//!
//! The loop ends when the change stream closes, which happens exactly once
//! through [`ViewWatcher::close`]. Paths already dirty at that point are
//! flushed before the loop returns.
//!
//! Every log line of the watcher goes to its logger, a [`Dispatch`] fixed
//! when the watcher is built: the caller's default at construction time,
//! or the one passed to [`ViewWatcher::with_logger`]. The loop runs under
//! that logger on whichever thread the runtime polls it from.

use crate::backend::{NotifyBackend, WatchBackend, WatchStreams};
use crate::config::ViewConfig;
use crate::debounce::DirtySet;
use crate::error::{Result, ViewError};
use crate::index::DependencyIndex;
use crate::rebuild;
use crate::stats::WatchStats;
use crate::view::View;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument::WithSubscriber;
use tracing::{debug, dispatcher, info, warn, Dispatch};

/// Watches the sources of a fixed set of views and rebuilds them on change.
pub struct ViewWatcher {
    index: Arc<DependencyIndex>,
    backend: Mutex<Option<Box<dyn WatchBackend>>>,
    streams: Mutex<Option<WatchStreams>>,
    task: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<WatchStats>,
    debounce: Duration,
    logger: Dispatch,
}

impl ViewWatcher {
    /// Create a watcher backed by the platform file watcher and subscribe
    /// to every source of every view.
    pub fn new(config: &ViewConfig, views: impl IntoIterator<Item = Arc<View>>) -> Result<Self> {
        let (backend, streams) = NotifyBackend::new(config.event_buffer)?;
        Self::with_backend(config, Box::new(backend), streams, views)
    }

    /// Create a watcher on a caller-supplied backend.
    pub fn with_backend(
        config: &ViewConfig,
        mut backend: Box<dyn WatchBackend>,
        streams: WatchStreams,
        views: impl IntoIterator<Item = Arc<View>>,
    ) -> Result<Self> {
        let mut index = DependencyIndex::new();
        for view in views {
            if let Err(e) = index.register(view, backend.as_mut()) {
                backend.close();
                return Err(e);
            }
        }

        info!(
            views = index.len(),
            files = index.path_count(),
            debounce_ms = config.debounce().as_millis() as u64,
            "View watcher ready"
        );

        Ok(Self {
            index: Arc::new(index),
            backend: Mutex::new(Some(backend)),
            streams: Mutex::new(Some(streams)),
            task: Mutex::new(None),
            stats: Arc::new(WatchStats::new()),
            debounce: config.debounce(),
            logger: dispatcher::get_default(Dispatch::clone),
        })
    }

    /// Send the watcher's logs to `logger` instead of the dispatcher that
    /// was the default when the watcher was built.
    pub fn with_logger(mut self, logger: impl Into<Dispatch>) -> Self {
        self.logger = logger.into();
        self
    }

    /// The dispatcher receiving the watcher's logs.
    pub fn logger(&self) -> &Dispatch {
        &self.logger
    }

    /// Spawn the watch loop on the current tokio runtime.
    pub fn start(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| ViewError::NoRuntime)?;
        let streams = self.take_streams()?;
        let handle = runtime.spawn(
            run_loop(self.index.clone(), streams, self.debounce, self.stats.clone())
                .with_subscriber(self.logger.clone()),
        );
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Run the watch loop on the calling task until the watcher is closed.
    pub async fn watch(&self) -> Result<()> {
        let streams = self.take_streams()?;
        run_loop(self.index.clone(), streams, self.debounce, self.stats.clone())
            .with_subscriber(self.logger.clone())
            .await;
        Ok(())
    }

    fn take_streams(&self) -> Result<WatchStreams> {
        if self.is_closed() {
            return Err(ViewError::Closed);
        }
        self.streams.lock().take().ok_or(ViewError::AlreadyStarted)
    }

    /// Release the subscriptions and stop the loop. Safe to call repeatedly.
    pub fn close(&self) -> Result<()> {
        let backend = self.backend.lock().take();
        let Some(mut backend) = backend else {
            return Ok(());
        };
        dispatcher::with_default(&self.logger, || {
            backend.close();
            info!("View watcher closed");
        });
        // Never started: nothing will drain these.
        self.streams.lock().take();
        Ok(())
    }

    /// Wait for a spawned loop to finish. Returns immediately if none was
    /// spawned or it was already awaited.
    pub async fn wait(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                dispatcher::with_default(&self.logger, || {
                    warn!(error = %e, "Watch loop task failed");
                });
            }
        }
    }

    /// Close and wait for the loop to drain.
    pub async fn shutdown(&self) -> Result<()> {
        self.close()?;
        self.wait().await;
        Ok(())
    }

    /// Whether [`ViewWatcher::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.backend.lock().is_none()
    }

    /// The dependency index built at registration.
    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    /// Watch loop counters.
    pub fn stats(&self) -> &WatchStats {
        &self.stats
    }

    /// Configured debounce window.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

impl Drop for ViewWatcher {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

async fn run_loop(
    index: Arc<DependencyIndex>,
    streams: WatchStreams,
    debounce: Duration,
    stats: Arc<WatchStats>,
) {
    let WatchStreams {
        mut changes,
        mut errors,
    } = streams;
    let mut dirty = DirtySet::new();
    let mut errors_open = true;

    let mut ticker = tokio::time::interval(debounce);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    debug!("Watch loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                flush_window(&index, &mut dirty, &stats);
            }
            path = changes.recv() => match path {
                Some(path) => {
                    stats.record_event();
                    dirty.add(path);
                }
                None => break,
            },
            error = errors.recv(), if errors_open => match error {
                Some(e) => {
                    stats.record_watch_error();
                    warn!(error = %e, "Watcher error");
                }
                None => errors_open = false,
            },
        }
    }

    flush_window(&index, &mut dirty, &stats);
    debug!("Watch loop stopped");
}

fn flush_window(index: &DependencyIndex, dirty: &mut DirtySet, stats: &WatchStats) {
    if dirty.is_empty() {
        return;
    }
    let paths = dirty.take();
    stats.record_flush();
    debug!(paths = paths.len(), "Flushing dirty paths");
    rebuild::flush(index, paths.iter().map(PathBuf::as_path), stats);
}
