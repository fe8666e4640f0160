//! Views: compiled templates bound to their declared source files.
//!
//! The compiled form lives behind an `ArcSwap`. Readers take one snapshot
//! per render and never block; a rebuild compiles off to the side and then
//! publishes the new snapshot with a single pointer swap.

use crate::config::ViewConfig;
use crate::engine::{self, Compiled, SourceFile};
use crate::error::{error_chain, Result, ViewError};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tera::Context;
use tracing::debug;

/// A named, renderable view compiled from a fixed set of source files.
pub struct View {
    name: String,
    entry: String,
    sources: Vec<SourceFile>,
    compiled: ArcSwap<Compiled>,
    /// Serialises writers; readers never take it.
    rebuild_lock: Mutex<()>,
}

impl View {
    /// Create a view from page names resolved against the configuration.
    ///
    /// Each page `p` resolves to `template_dir/p + template_ext`; every
    /// template in `layout_dir` is appended. Template names are paths
    /// relative to `template_dir`, e.g. `layout/default.html`.
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        entry: impl Into<String>,
        pages: &[S],
        config: &ViewConfig,
    ) -> Result<Self> {
        let mut paths: Vec<PathBuf> = pages
            .iter()
            .map(|p| config.page_path(p.as_ref()))
            .collect();
        paths.extend(layout_files(config)?);

        let root = canonical(&config.template_dir).ok();
        let sources = resolve_sources(paths, |path| match &root {
            Some(root) => relative_name(path, root),
            None => file_name(path),
        })?;

        Self::build(name.into(), entry.into(), sources)
    }

    /// Create a view from explicit file paths. Each template is named by
    /// its file name.
    pub fn from_files<P: Into<PathBuf>>(
        name: impl Into<String>,
        entry: impl Into<String>,
        files: impl IntoIterator<Item = P>,
    ) -> Result<Self> {
        let paths: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        let sources = resolve_sources(paths, file_name)?;
        Self::build(name.into(), entry.into(), sources)
    }

    fn build(name: String, entry: String, sources: Vec<SourceFile>) -> Result<Self> {
        let templates =
            engine::compile(&sources).map_err(|message| ViewError::Compile {
                view: name.clone(),
                message,
            })?;
        let compiled = Compiled::new(templates, 0);

        if !compiled.has_template(&entry) {
            return Err(ViewError::Compile {
                view: name,
                message: format!("entry template '{}' is not among the sources", entry),
            });
        }

        debug!(view = %name, entry = %entry, files = sources.len(), "View compiled");

        Ok(Self {
            name,
            entry,
            sources,
            compiled: ArcSwap::from_pointee(compiled),
            rebuild_lock: Mutex::new(()),
        })
    }

    /// Unique view name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template rendered by [`View::render`].
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Declared sources in registration order.
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Canonical paths of the declared sources.
    pub fn source_files(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|s| s.path.as_path())
    }

    /// Whether the view depends on the given canonical path.
    pub fn depends_on(&self, path: &Path) -> bool {
        self.sources.iter().any(|s| s.path == path)
    }

    /// Generation of the currently published snapshot.
    pub fn generation(&self) -> u64 {
        self.compiled.load().generation()
    }

    /// The currently published snapshot. Holding it keeps it alive across
    /// later rebuilds.
    pub fn snapshot(&self) -> Arc<Compiled> {
        self.compiled.load_full()
    }

    /// Recompile from the complete source set and publish on success.
    ///
    /// Returns the new generation. On failure the published snapshot is
    /// left untouched.
    pub fn reload(&self) -> Result<u64> {
        let _guard = self.rebuild_lock.lock();

        let templates =
            engine::compile(&self.sources).map_err(|message| ViewError::Compile {
                view: self.name.clone(),
                message,
            })?;

        let generation = self.compiled.load().generation() + 1;
        self.compiled
            .store(Arc::new(Compiled::new(templates, generation)));
        Ok(generation)
    }

    /// Render the entry template with serializable data.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        let context = Context::from_serialize(data).map_err(|e| ViewError::Render {
            view: self.name.clone(),
            message: error_chain(&e),
        })?;
        self.render_context(&context)
    }

    /// Render the entry template with a prepared context.
    pub fn render_context(&self, context: &Context) -> Result<String> {
        let snapshot = self.compiled.load_full();
        snapshot
            .render(&self.entry, context)
            .map_err(|message| ViewError::Render {
                view: self.name.clone(),
                message,
            })
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("sources", &self.sources)
            .field("generation", &self.generation())
            .finish()
    }
}

/// Canonicalise and deduplicate paths, keeping first-seen order.
fn resolve_sources(
    paths: Vec<PathBuf>,
    name_of: impl Fn(&Path) -> String,
) -> Result<Vec<SourceFile>> {
    let mut seen = HashSet::new();
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let path = canonical(&path)?;
        if seen.insert(path.clone()) {
            let name = name_of(&path);
            sources.push(SourceFile { path, name });
        }
    }
    Ok(sources)
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|_| ViewError::SourceNotFound(path.to_path_buf()))
}

/// Templates in the layout directory, sorted for a stable order.
/// A missing directory contributes nothing.
fn layout_files(config: &ViewConfig) -> Result<Vec<PathBuf>> {
    let dir = &config.layout_dir;
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && config.is_template(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn relative_name(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => file_name(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_from_files_renders_entry() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "Hello");

        let view = View::from_files("home", "home.tpl", [home]).unwrap();
        assert_eq!(view.name(), "home");
        assert_eq!(view.generation(), 0);
        assert_eq!(view.render(&serde_json::json!({})).unwrap(), "Hello");
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempdir().unwrap();
        let err = View::from_files("home", "home.tpl", [dir.path().join("home.tpl")]).unwrap_err();
        assert!(matches!(err, ViewError::SourceNotFound(_)));
    }

    #[test]
    fn test_initial_compile_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "{% if %}");

        let err = View::from_files("home", "home.tpl", [home]).unwrap_err();
        assert!(matches!(err, ViewError::Compile { .. }));
    }

    #[test]
    fn test_unknown_entry_is_fatal() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "Hello");

        let err = View::from_files("home", "index.tpl", [home]).unwrap_err();
        assert!(err.to_string().contains("index.tpl"));
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.tpl", "a");
        let b = write(dir.path(), "b.tpl", "b");

        let view = View::from_files("v", "a.tpl", [a.clone(), b.clone(), a.clone()]).unwrap();
        let names: Vec<_> = view.sources().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a.tpl", "b.tpl"]);
        assert!(view.depends_on(&b.canonicalize().unwrap()));
    }

    #[test]
    fn test_reload_publishes_new_generation() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "Hello");
        let view = View::from_files("home", "home.tpl", [home.clone()]).unwrap();

        fs::write(&home, "Hi").unwrap();
        assert_eq!(view.reload().unwrap(), 1);
        assert_eq!(view.generation(), 1);
        assert_eq!(view.render(&serde_json::json!({})).unwrap(), "Hi");
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "Hello");
        let view = View::from_files("home", "home.tpl", [home.clone()]).unwrap();

        fs::write(&home, "Hello {{ oops").unwrap();
        assert!(view.reload().is_err());
        assert_eq!(view.generation(), 0);
        assert_eq!(view.render(&serde_json::json!({})).unwrap(), "Hello");
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "old");
        let view = View::from_files("home", "home.tpl", [home.clone()]).unwrap();

        let held = view.snapshot();
        fs::write(&home, "new").unwrap();
        view.reload().unwrap();

        assert_eq!(held.render("home.tpl", &Context::new()).unwrap(), "old");
        assert_eq!(view.render(&serde_json::json!({})).unwrap(), "new");
    }

    #[test]
    fn test_new_resolves_pages_and_layouts() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("view");
        write(
            &root,
            "layout/default.html",
            "<main>{% block content %}{% endblock content %}</main>",
        );
        write(&root, "layout/notes.txt", "ignored");
        write(
            &root,
            "static/index.html",
            r#"{% extends "layout/default.html" %}{% block content %}{{ title }}{% endblock content %}"#,
        );

        let config = ViewConfig {
            template_dir: root.clone(),
            layout_dir: root.join("layout"),
            ..Default::default()
        };
        let view = View::new("index", "static/index.html", &["static/index"], &config).unwrap();

        let names: Vec<_> = view.sources().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["static/index.html", "layout/default.html"]);
        assert_eq!(
            view.render(&serde_json::json!({ "title": "Evil 1991" })).unwrap(),
            "<main>Evil 1991</main>"
        );
    }

    #[test]
    fn test_new_without_layout_dir() {
        let dir = tempdir().unwrap();
        write(dir.path(), "home.tpl", "Hello");

        let config = ViewConfig {
            template_dir: dir.path().to_path_buf(),
            layout_dir: dir.path().join("layout"),
            template_ext: ".tpl".to_string(),
            ..Default::default()
        };
        let view = View::new("home", "home.tpl", &["home"], &config).unwrap();
        assert_eq!(view.sources().len(), 1);
    }

    #[test]
    fn test_render_requires_object_data() {
        let dir = tempdir().unwrap();
        let home = write(dir.path(), "home.tpl", "Hello");
        let view = View::from_files("home", "home.tpl", [home]).unwrap();

        let err = view.render(&42).unwrap_err();
        assert!(matches!(err, ViewError::Render { .. }));
    }
}
