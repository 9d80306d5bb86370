//! File watcher: runs `check` on startup, then rebuilds and re-evaluates
//! only the source files that change.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::cache::ObjectCache;
use crate::commands::{self, OutputFormat};
use crate::config::Config;
use crate::error;
use crate::findings;
use crate::workspace;

/// Debounce delay between filesystem events and re-evaluation.
const DEBOUNCE_MS: u64 = 100;

/// Drain the channel until it stays quiet for the debounce delay.
fn collect_batch(first: PathBuf, rx: &crossbeam_channel::Receiver<PathBuf>) -> BTreeSet<PathBuf> {
    let mut changed = BTreeSet::from([first]);
    let debounce = Duration::from_millis(DEBOUNCE_MS);
    while let Ok(path) = rx.recv_timeout(debounce) {
        changed.insert(path);
    }
    return changed;
}

/// Create a filesystem watcher that sends changed source paths on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<PathBuf>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            for path in event.paths.into_iter().filter(|p| return workspace::is_source_file(p)) {
                let _ = tx.send(path);
            }
        }
    })
    .map_err(|e| {
        return error::Error::Watch {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Rebuild each changed file, then print the findings for just those files.
/// Returns whether any finding was printed.
///
/// # Errors
///
/// Returns `Error::Json` if JSON output fails.
fn reevaluate(
    root: &Path,
    config: &Config,
    cache: &ObjectCache,
    changed: &BTreeSet<PathBuf>,
    format: OutputFormat,
) -> Result<bool, error::Error> {
    let mut reported = Vec::new();
    for path in changed {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if !config.should_scan(&relative.to_string_lossy()) {
            continue;
        }
        if let Err(e) = workspace::refresh_file(cache, root, relative, &config.settings) {
            tracing::warn!("skipping {}: {e}", relative.display());
            continue;
        }
        match cache.get(relative) {
            Some(object) => reported.extend(findings::evaluate(&object, &config.settings)),
            None => tracing::debug!("{}: removed from cache", relative.display()),
        }
    }
    commands::print_findings(&reported, format)?;
    return Ok(!reported.is_empty());
}

/// Entry point for the watch command.
///
/// Scans and checks the whole workspace once, then watches its root and
/// re-evaluates changed source files.
///
/// # Errors
///
/// Returns errors from root discovery, config loading, or watcher setup.
pub fn run(format: OutputFormat) -> Result<ExitCode, error::Error> {
    let root = commands::workspace_root()?;
    let config = Config::load(&root)?;
    let cache = ObjectCache::new();

    eprintln!("watch: initial check");
    workspace::scan(&root, &config, &cache, &AtomicBool::new(false));
    let initial = commands::evaluate_cache(&cache, &config.settings);
    commands::print_findings(&initial, format)?;
    let mut last_code = if initial.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) };

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| return error::Error::Watch { reason: format!("cannot watch {}: {e}", root.display()) })?;

    eprintln!("watch: monitoring {} objects under {}, press Ctrl+C to stop", cache.len(), root.display());

    while let Ok(first) = rx.recv() {
        let changed = collect_batch(first, &rx);
        eprintln!("watch: {} files changed, re-checking...", changed.len());
        last_code = match reevaluate(&root, &config, &cache, &changed, format) {
            Ok(true) => ExitCode::from(1),
            Ok(false) => ExitCode::SUCCESS,
            Err(e) => {
                crate::diagnostics::print_error(&e);
                ExitCode::from(2)
            },
        };
    }

    return Ok(last_code);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn batch_deduplicates_paths() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(PathBuf::from("/w/src/A.al")).unwrap();
        tx.send(PathBuf::from("/w/src/B.al")).unwrap();
        tx.send(PathBuf::from("/w/src/A.al")).unwrap();
        drop(tx);
        let changed = collect_batch(PathBuf::from("/w/src/A.al"), &rx);
        assert_eq!(changed.len(), 2);
    }

    #[test]
    fn reevaluate_rebuilds_and_drops_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/A.al"), "codeunit 1 A\n{\n}\n").unwrap();
        std::fs::write(root.join("src/B.al"), "/// <summary>B.</summary>\ncodeunit 2 B\n{\n}\n").unwrap();

        let config = Config::default();
        let cache = ObjectCache::new();
        workspace::scan(root, &config, &cache, &AtomicBool::new(false));
        assert_eq!(cache.len(), 2);

        std::fs::write(root.join("src/A.al"), "/// <summary>A.</summary>\ncodeunit 1 A\n{\n}\n").unwrap();
        std::fs::remove_file(root.join("src/B.al")).unwrap();
        let changed = BTreeSet::from([root.join("src/A.al"), root.join("src/B.al")]);

        let reported = reevaluate(root, &config, &cache, &changed, OutputFormat::Text).unwrap();
        assert!(!reported);
        assert!(cache.get(Path::new("src/A.al")).unwrap().documentation.exists);
        assert!(cache.get(Path::new("src/B.al")).is_none());
    }
}
