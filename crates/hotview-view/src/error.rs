//! View error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while compiling, watching or rendering views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A declared source file does not exist
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Failed to compile a view's templates
    #[error("Compile error in view {view}: {message}")]
    Compile { view: String, message: String },

    /// Failed to render a compiled view
    #[error("Render error in view {view}: {message}")]
    Render { view: String, message: String },

    /// No view registered under this name
    #[error("Unknown view: {0}")]
    UnknownView(String),

    /// A view with this name is already registered
    #[error("Duplicate view: {0}")]
    DuplicateView(String),

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// The watch loop was already started
    #[error("Watcher already started")]
    AlreadyStarted,

    /// The watcher has been closed
    #[error("Watcher closed")]
    Closed,

    /// The watch loop needs a tokio runtime to run on
    #[error("No tokio runtime to run the watch loop on")]
    NoRuntime,
}

impl From<notify::Error> for ViewError {
    fn from(e: notify::Error) -> Self {
        ViewError::Watcher(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewError>;

/// Flatten an error and its sources into one line.
///
/// Tera reports the useful detail (file, line, expected token) in the
/// source chain rather than the top-level message.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
