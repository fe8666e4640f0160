//! Rebuild executor.
//!
//! Recompiles the views that depend on changed paths. A failed rebuild
//! leaves the view serving its last good snapshot and never stops the
//! remaining views from being rebuilt.

use crate::index::DependencyIndex;
use crate::stats::WatchStats;
use crate::view::View;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of a rebuild pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Views recompiled and published
    pub rebuilt: Vec<String>,
    /// Views whose recompilation failed
    pub failed: Vec<String>,
}

impl RebuildReport {
    /// Whether nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.rebuilt.is_empty() && self.failed.is_empty()
    }
}

/// Rebuild every view depending on `path`. Unknown paths are a no-op.
pub fn rebuild(index: &DependencyIndex, path: &Path, stats: &WatchStats) -> RebuildReport {
    let views = index.lookup(path);
    if views.is_empty() {
        debug!(path = ?path, "No views depend on path");
    }
    rebuild_views(&views, stats)
}

/// Rebuild every view depending on any of `paths`, each view once.
pub fn flush<'a>(
    index: &DependencyIndex,
    paths: impl IntoIterator<Item = &'a Path>,
    stats: &WatchStats,
) -> RebuildReport {
    let views = index.affected(paths);
    rebuild_views(&views, stats)
}

fn rebuild_views(views: &[Arc<View>], stats: &WatchStats) -> RebuildReport {
    let mut report = RebuildReport::default();
    for view in views {
        match view.reload() {
            Ok(generation) => {
                info!(view = %view.name(), generation, "View reloaded");
                stats.record_rebuild(true);
                report.rebuilt.push(view.name().to_string());
            }
            Err(e) => {
                error!(
                    view = %view.name(),
                    generation = view.generation(),
                    error = %e,
                    "Failed to reload view, keeping previous version"
                );
                stats.record_rebuild(false);
                report.failed.push(view.name().to_string());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChannelBackend;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        index: DependencyIndex,
        home: PathBuf,
        about: PathBuf,
        base: PathBuf,
    }

    /// `home` = home.tpl + base.tpl, `about` = about.tpl + base.tpl
    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let home = dir.path().join("home.tpl");
        let about = dir.path().join("about.tpl");
        let base = dir.path().join("base.tpl");
        fs::write(&home, "home").unwrap();
        fs::write(&about, "about").unwrap();
        fs::write(&base, "base").unwrap();

        let (mut backend, _streams, _injector) = ChannelBackend::new(8);
        let mut index = DependencyIndex::new();
        for (name, page) in [("home", &home), ("about", &about)] {
            let entry = format!("{}.tpl", name);
            let view = View::from_files(name, entry, [page.clone(), base.clone()]).unwrap();
            index.register(Arc::new(view), &mut backend).unwrap();
        }

        Fixture {
            home: home.canonicalize().unwrap(),
            about: about.canonicalize().unwrap(),
            base: base.canonicalize().unwrap(),
            _dir: dir,
            index,
        }
    }

    fn generation(index: &DependencyIndex, name: &str) -> u64 {
        index.get(name).unwrap().generation()
    }

    #[test]
    fn test_rebuild_only_dependents() {
        let f = fixture();
        let stats = WatchStats::new();

        let report = rebuild(&f.index, &f.home, &stats);
        assert_eq!(report.rebuilt, vec!["home"]);
        assert_eq!(generation(&f.index, "home"), 1);
        assert_eq!(generation(&f.index, "about"), 0);
    }

    #[test]
    fn test_rebuild_shared_source() {
        let f = fixture();
        let stats = WatchStats::new();

        let report = rebuild(&f.index, &f.base, &stats);
        assert_eq!(report.rebuilt, vec!["home", "about"]);
        assert_eq!(stats.rebuild_count(), 2);
    }

    #[test]
    fn test_rebuild_unknown_path_is_noop() {
        let f = fixture();
        let stats = WatchStats::new();

        let report = rebuild(&f.index, Path::new("/elsewhere/x.tpl"), &stats);
        assert!(report.is_empty());
        assert_eq!(stats.rebuild_count(), 0);
    }

    #[test]
    fn test_failure_does_not_block_siblings() {
        let f = fixture();
        let stats = WatchStats::new();

        fs::write(&f.home, "{{ broken").unwrap();
        fs::write(&f.about, "about v2").unwrap();

        let report = rebuild(&f.index, &f.base, &stats);
        assert_eq!(report.failed, vec!["home"]);
        assert_eq!(report.rebuilt, vec!["about"]);

        let home = f.index.get("home").unwrap();
        assert_eq!(home.render(&serde_json::json!({})).unwrap(), "home");
        let about = f.index.get("about").unwrap();
        assert_eq!(about.render(&serde_json::json!({})).unwrap(), "about v2");
        assert_eq!(stats.failure_count(), 1);
    }

    #[test]
    fn test_flush_rebuilds_each_view_once() {
        let f = fixture();
        let stats = WatchStats::new();

        let report = flush(
            &f.index,
            [f.home.as_path(), f.base.as_path(), f.about.as_path()],
            &stats,
        );
        assert_eq!(report.rebuilt, vec!["home", "about"]);
        assert_eq!(generation(&f.index, "home"), 1);
        assert_eq!(generation(&f.index, "about"), 1);
    }
}
