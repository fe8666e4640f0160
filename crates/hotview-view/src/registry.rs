//! Name-based rendering for request handlers.

use crate::error::{Result, ViewError};
use crate::view::View;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tera::Context;
use tracing::error;

/// Views addressable by name. Cheap to clone and share across handlers.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    views: Arc<HashMap<String, Arc<View>>>,
}

impl ViewRegistry {
    /// Build a registry. Later views replace earlier ones with the same name.
    pub fn new(views: impl IntoIterator<Item = Arc<View>>) -> Self {
        let views = views
            .into_iter()
            .map(|v| (v.name().to_string(), v))
            .collect();
        Self {
            views: Arc::new(views),
        }
    }

    /// Look up a view.
    pub fn get(&self, name: &str) -> Option<&Arc<View>> {
        self.views.get(name)
    }

    /// Registered view names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render a view with serializable data.
    ///
    /// Reads the view's current snapshot once; never waits for a rebuild.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        let view = self.lookup(name)?;
        view.render(data).map_err(|e| log_failure(name, e))
    }

    /// Render a view with a prepared context.
    pub fn render_context(&self, name: &str, context: &Context) -> Result<String> {
        let view = self.lookup(name)?;
        view.render_context(context)
            .map_err(|e| log_failure(name, e))
    }

    fn lookup(&self, name: &str) -> Result<&Arc<View>> {
        self.views
            .get(name)
            .ok_or_else(|| ViewError::UnknownView(name.to_string()))
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

fn log_failure(name: &str, e: ViewError) -> ViewError {
    error!(view = %name, error = %e, "Failed to render view");
    e
}
