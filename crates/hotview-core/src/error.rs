//! Core error types for hotview.

use thiserror::Error;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Page not declared in the configuration
    #[error("Unknown page: {0}")]
    UnknownPage(String),

    /// View error
    #[error(transparent)]
    View(#[from] hotview_view::ViewError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
