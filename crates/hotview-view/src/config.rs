//! Configuration for views and the view watcher.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// View and watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Directory page files are resolved against
    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,

    /// Directory whose templates are added to every view
    #[serde(default = "default_layout_dir")]
    pub layout_dir: PathBuf,

    /// Extension appended to page names and used to select layout files
    #[serde(default = "default_template_ext")]
    pub template_ext: String,

    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Capacity of the change and error event channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("view")
}

fn default_layout_dir() -> PathBuf {
    PathBuf::from("view/layout")
}

fn default_template_ext() -> String {
    ".html".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_event_buffer() -> usize {
    1000
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            template_dir: default_template_dir(),
            layout_dir: default_layout_dir(),
            template_ext: default_template_ext(),
            debounce_ms: default_debounce_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ViewConfig {
    /// Debounce window as a duration (never zero).
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.max(1))
    }

    /// Resolve a page name to its file, e.g. `home` -> `view/home.html`.
    pub fn page_path(&self, page: &str) -> PathBuf {
        self.template_dir
            .join(format!("{}{}", page, self.template_ext))
    }

    /// Whether a path carries the configured template extension.
    pub fn is_template(&self, path: &std::path::Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.ends_with(&self.template_ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ViewConfig::default();
        assert_eq!(config.template_dir, PathBuf::from("view"));
        assert_eq!(config.layout_dir, PathBuf::from("view/layout"));
        assert_eq!(config.template_ext, ".html");
        assert_eq!(config.debounce(), Duration::from_secs(1));
    }

    #[test]
    fn test_page_path() {
        let config = ViewConfig {
            template_ext: ".tpl".to_string(),
            ..Default::default()
        };
        assert_eq!(config.page_path("home"), PathBuf::from("view/home.tpl"));
        assert_eq!(
            config.page_path("game/office"),
            PathBuf::from("view/game/office.tpl")
        );
    }

    #[test]
    fn test_zero_debounce_clamped() {
        let config = ViewConfig {
            debounce_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.debounce(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ViewConfig = serde_json::from_str(r#"{"debounce_ms": 250}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.template_ext, ".html");
        assert_eq!(config.event_buffer, 1000);
    }

    #[test]
    fn test_is_template() {
        let config = ViewConfig::default();
        assert!(config.is_template(std::path::Path::new("view/layout/default.html")));
        assert!(!config.is_template(std::path::Path::new("view/layout/notes.txt")));
    }
}
