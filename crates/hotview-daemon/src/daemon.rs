//! Daemon lifecycle management.

use anyhow::{Context, Result};
use hotview_core::{merge_data, DaemonConfig, Site};
use serde_json::Value;
use std::future::Future;

use crate::signals;

/// The main daemon process
pub struct Daemon {
    config: DaemonConfig,
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new(config: DaemonConfig) -> Self {
        Self { config }
    }

    /// Compile every page and keep them in sync until a shutdown signal.
    pub async fn run(&self) -> Result<()> {
        self.run_until(signals::shutdown_signal()).await
    }

    /// Compile every page and keep them in sync until `shutdown` resolves.
    pub async fn run_until<T: std::fmt::Display>(
        &self,
        shutdown: impl Future<Output = T>,
    ) -> Result<()> {
        tracing::info!(
            template_dir = %self.config.templates.template_dir.display(),
            pages = self.config.pages.len(),
            "Daemon starting"
        );

        let site = Site::new(&self.config).context("Failed to build site")?;
        site.start().context("Failed to start watcher")?;

        let reason = shutdown.await;

        tracing::info!(reason = %reason, "Shutting down...");
        site.shutdown().await?;
        tracing::info!("Shutdown complete");

        Ok(())
    }

    /// Compile every page once. Returns the number of pages compiled.
    pub fn check(&self) -> Result<usize> {
        let views = Site::compile(&self.config).context("Template check failed")?;
        for view in &views {
            tracing::info!(
                page = %view.name(),
                files = view.sources().len(),
                "Page compiled"
            );
        }
        Ok(views.len())
    }

    /// Compile the site and render one page.
    pub fn render(&self, name: &str, data: Option<&str>) -> Result<String> {
        let data: Option<Value> = data
            .map(serde_json::from_str)
            .transpose()
            .context("Invalid --data JSON")?;

        let views = Site::compile(&self.config)?;
        let page = self
            .config
            .page(name)
            .with_context(|| format!("Unknown page: {}", name))?;
        let view = views
            .iter()
            .find(|v| v.name() == name)
            .with_context(|| format!("Unknown page: {}", name))?;

        Ok(view.render(&merge_data(&page.data, data.as_ref()))?)
    }
}
