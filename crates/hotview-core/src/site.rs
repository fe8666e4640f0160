//! Site assembly: configured pages become watched, renderable views.

use crate::{CoreError, DaemonConfig, PageConfig};
use hotview_view::{View, ViewRegistry, ViewWatcher};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// All configured pages, compiled, plus the watcher keeping them fresh.
pub struct Site {
    pages: Vec<PageConfig>,
    registry: ViewRegistry,
    watcher: ViewWatcher,
}

impl Site {
    /// Compile every page and subscribe to its sources.
    ///
    /// Any missing file, compile error or failed subscription aborts
    /// startup.
    pub fn new(config: &DaemonConfig) -> Result<Self, CoreError> {
        let views = Self::compile(config)?;
        let watcher = ViewWatcher::new(&config.templates, views.iter().cloned())?;

        info!(pages = views.len(), "Site ready");

        Ok(Self {
            pages: config.pages.clone(),
            registry: ViewRegistry::new(views),
            watcher,
        })
    }

    /// Compile every configured page without watching anything.
    pub fn compile(config: &DaemonConfig) -> Result<Vec<Arc<View>>, CoreError> {
        config.validate()?;
        config
            .pages
            .iter()
            .map(|page| {
                View::new(&page.name, &page.entry, page.files.as_slice(), &config.templates)
                    .map(Arc::new)
                    .map_err(CoreError::from)
            })
            .collect()
    }

    /// Start the watch loop on the current runtime.
    pub fn start(&self) -> Result<(), CoreError> {
        self.watcher.start()?;
        Ok(())
    }

    /// Render a page. `data` is merged over the page's configured data.
    pub fn render(&self, name: &str, data: Option<&Value>) -> Result<String, CoreError> {
        let page = self
            .pages
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CoreError::UnknownPage(name.to_string()))?;

        let merged = merge_data(&page.data, data);
        Ok(self.registry.render(name, &merged)?)
    }

    /// Views addressable by page name.
    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    /// The watcher keeping the views in sync.
    pub fn watcher(&self) -> &ViewWatcher {
        &self.watcher
    }

    /// Stop watching and wait for pending rebuilds to finish.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.watcher.shutdown().await?;
        Ok(())
    }
}

/// Shallow merge of request data over page defaults. Non-object values
/// replace the defaults entirely; `null` keeps them.
pub fn merge_data(defaults: &Value, overrides: Option<&Value>) -> Value {
    let mut merged = match defaults {
        Value::Object(_) => defaults.clone(),
        _ => Value::Object(Default::default()),
    };
    match overrides {
        Some(Value::Object(extra)) => {
            if let Value::Object(base) = &mut merged {
                for (key, value) in extra {
                    base.insert(key.clone(), value.clone());
                }
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => merged = other.clone(),
    }
    merged
}
