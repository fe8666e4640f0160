//! Configuration for the hotview daemon.

use crate::CoreError;
use hotview_view::ViewConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "hotview.yaml";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Template locations and watcher tuning
    #[serde(default)]
    pub templates: ViewConfig,

    /// Pages to compile and watch
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

/// A page: one view compiled from a list of page files plus the layouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    /// Unique page name
    pub name: String,

    /// Template rendered for this page, e.g. `layout/default.html`
    pub entry: String,

    /// Page files relative to the template directory, without extension
    #[serde(default)]
    pub files: Vec<String>,

    /// Data rendered with the page unless overridden per request
    #[serde(default)]
    pub data: serde_json::Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            templates: ViewConfig::default(),
            pages: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load `hotview.yaml` from the working directory, falling back to defaults
    pub fn load() -> Self {
        let config_path = PathBuf::from(CONFIG_FILE);

        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a consistent site
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut names = std::collections::HashSet::new();
        for page in &self.pages {
            if page.name.is_empty() {
                return Err(CoreError::Config("page with empty name".to_string()));
            }
            if !names.insert(page.name.as_str()) {
                return Err(CoreError::Config(format!("duplicate page: {}", page.name)));
            }
        }
        Ok(())
    }

    /// Find a page by name
    pub fn page(&self, name: &str) -> Option<&PageConfig> {
        self.pages.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
log_level: debug
templates:
  template_dir: view
  layout_dir: view/layout
  template_ext: .gohtml
  debounce_ms: 250
pages:
  - name: default
    entry: layout/default.gohtml
    files: [static/index]
    data:
      title: Evil 1991
  - name: engine
    entry: layout/engine.gohtml
    files: [game/intern-office]
"#;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::load();
        assert_eq!(config.log_level, "info");
        assert!(config.pages.is_empty());
        assert_eq!(config.templates.debounce(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, SAMPLE).unwrap();

        let config = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.templates.template_ext, ".gohtml");
        assert_eq!(config.templates.debounce(), Duration::from_millis(250));
        assert_eq!(config.pages.len(), 2);

        let page = config.page("default").unwrap();
        assert_eq!(page.files, vec!["static/index"]);
        assert_eq!(page.data["title"], "Evil 1991");
        assert!(config.page("engine").unwrap().data.is_null());
    }

    #[test]
    fn test_duplicate_pages_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            "pages:\n  - {name: a, entry: a.html}\n  - {name: a, entry: b.html}\n",
        )
        .unwrap();

        let err = DaemonConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("duplicate page"));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "pages: [").unwrap();

        assert!(matches!(
            DaemonConfig::load_from(&path),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: DaemonConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.log_level, "warn");
        assert_eq!(parsed.templates, config.templates);
    }
}
