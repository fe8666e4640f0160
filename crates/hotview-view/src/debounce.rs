//! Change coalescing for the watch loop.
//!
//! Filesystem notifications arrive in bursts (a single save can emit
//! several events). The watch loop records them in a [`DirtySet`] and only
//! acts on the distinct paths once per debounce window.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Deduplicated set of paths changed during the current window.
#[derive(Debug, Default)]
pub struct DirtySet {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl DirtySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed path. Repeated paths keep their first position.
    pub fn add(&mut self, path: PathBuf) {
        if self.seen.insert(path.clone()) {
            self.paths.push(path);
        }
    }

    /// Whether the path is already dirty.
    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// Take the current window's paths in insertion order and reset.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.seen.clear();
        std::mem::take(&mut self.paths)
    }

    /// Get the number of pending paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
