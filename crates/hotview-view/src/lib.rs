//! Hotview Views
//!
//! This crate keeps compiled template views in sync with their source files:
//! - Views compiled from a declared set of template files
//! - A dependency index from source path to dependent views
//! - A debounced watch loop that rebuilds views when sources change
//! - Lock-free rendering against the last successfully compiled snapshot

mod config;
mod engine;
mod error;
mod index;
mod registry;
mod stats;
mod view;

pub mod backend;
pub mod debounce;
pub mod rebuild;
pub mod watcher;

pub use backend::{ChannelBackend, EventInjector, NotifyBackend, WatchBackend, WatchStreams};
pub use config::ViewConfig;
pub use debounce::DirtySet;
pub use engine::{Compiled, SourceFile};
pub use error::{Result, ViewError};
pub use index::DependencyIndex;
pub use rebuild::{flush, rebuild, RebuildReport};
pub use registry::ViewRegistry;
pub use stats::WatchStats;
pub use view::View;
pub use watcher::ViewWatcher;
