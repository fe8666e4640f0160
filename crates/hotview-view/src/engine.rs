//! Template compilation.
//!
//! A view's compiled form is a fresh `tera::Tera` built from the view's
//! complete source set. Compiled values are immutable once built; a rebuild
//! always produces a new [`Compiled`].

use crate::error::error_chain;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

/// A template source file and the name it is registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Canonical path to the file
    pub path: PathBuf,
    /// Template name used by `extends`/`include` and as render entry
    pub name: String,
}

impl SourceFile {
    /// Create a source file entry.
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// An immutable compiled snapshot of a view.
pub struct Compiled {
    templates: Tera,
    generation: u64,
}

impl Compiled {
    pub(crate) fn new(templates: Tera, generation: u64) -> Self {
        Self {
            templates,
            generation,
        }
    }

    /// Number of successful rebuilds that preceded this snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a template with this name was compiled.
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.get_template_names().any(|n| n == name)
    }

    /// Render the named template.
    pub fn render(&self, entry: &str, context: &Context) -> Result<String, String> {
        self.templates
            .render(entry, context)
            .map_err(|e| error_chain(&e))
    }
}

impl std::fmt::Debug for Compiled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.templates.get_template_names().collect();
        names.sort_unstable();
        f.debug_struct("Compiled")
            .field("generation", &self.generation)
            .field("templates", &names)
            .finish()
    }
}

/// Compile every source into one template set.
///
/// Errors carry the full cause chain (file and parse position).
pub fn compile(sources: &[SourceFile]) -> Result<Tera, String> {
    let mut tera = Tera::default();
    let files: Vec<(&Path, Option<&str>)> = sources
        .iter()
        .map(|s| (s.path.as_path(), Some(s.name.as_str())))
        .collect();
    tera.add_template_files(files)
        .map_err(|e| error_chain(&e))?;
    Ok(tera)
}
