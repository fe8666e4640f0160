//! Dependency index from source path to dependent views.
//!
//! Built once while views are registered and read-only afterwards.

use crate::backend::WatchBackend;
use crate::error::{Result, ViewError};
use crate::view::View;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Maps each watched source file to the views compiled from it.
#[derive(Default)]
pub struct DependencyIndex {
    views: Vec<Arc<View>>,
    by_path: HashMap<PathBuf, Vec<usize>>,
    names: HashMap<String, usize>,
}

impl DependencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view and subscribe to each of its sources not yet watched.
    ///
    /// A subscription failure is returned as-is; callers treat it as a
    /// startup error.
    pub fn register(&mut self, view: Arc<View>, backend: &mut dyn WatchBackend) -> Result<()> {
        if self.names.contains_key(view.name()) {
            return Err(ViewError::DuplicateView(view.name().to_string()));
        }

        // Subscribe before touching the index so a failure leaves it unchanged.
        for path in view.source_files() {
            if !self.by_path.contains_key(path) {
                backend.subscribe(path)?;
            }
        }

        let id = self.views.len();
        for path in view.source_files() {
            let dependents = self.by_path.entry(path.to_path_buf()).or_default();
            if !dependents.contains(&id) {
                dependents.push(id);
            }
        }
        debug!(view = %view.name(), files = view.sources().len(), "View registered");

        self.names.insert(view.name().to_string(), id);
        self.views.push(view);
        Ok(())
    }

    /// Views depending on a path. Unknown paths yield nothing.
    pub fn lookup(&self, path: &Path) -> Vec<Arc<View>> {
        self.by_path
            .get(path)
            .map(|ids| ids.iter().map(|&id| self.views[id].clone()).collect())
            .unwrap_or_default()
    }

    /// Union of the views depending on any of the paths, each once, in
    /// first-seen order.
    pub fn affected<'a>(&self, paths: impl IntoIterator<Item = &'a Path>) -> Vec<Arc<View>> {
        let mut seen = HashSet::new();
        let mut views = Vec::new();
        for path in paths {
            if let Some(ids) = self.by_path.get(path) {
                for &id in ids {
                    if seen.insert(id) {
                        views.push(self.views[id].clone());
                    }
                }
            }
        }
        views
    }

    /// Look up a view by name.
    pub fn get(&self, name: &str) -> Option<&Arc<View>> {
        self.names.get(name).map(|&id| &self.views[id])
    }

    /// All registered views in registration order.
    pub fn views(&self) -> &[Arc<View>] {
        &self.views
    }

    /// Whether the path is a source of any registered view.
    pub fn is_watched(&self, path: &Path) -> bool {
        self.by_path.contains_key(path)
    }

    /// Number of distinct watched paths.
    pub fn path_count(&self) -> usize {
        self.by_path.len()
    }

    /// Number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
