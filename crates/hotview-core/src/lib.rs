//! Hotview Core Components
//!
//! This crate provides the daemon-facing pieces of hotview: YAML
//! configuration and the site that turns configured pages into watched,
//! renderable views.

mod config;
mod error;
mod site;

pub use config::{DaemonConfig, PageConfig};
pub use error::CoreError;
pub use site::{merge_data, Site};
