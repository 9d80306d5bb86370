//! Workspace orchestration: finding the root, discovering sources, and
//! filling the object cache in batches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use walkdir::WalkDir;

use crate::builder;
use crate::cache::ObjectCache;
use crate::config::{CONFIG_FILE, Config, Settings};
use crate::document::TextDocument;
use crate::error::Error;
use crate::types::SourceObject;

/// App manifest that marks a workspace root.
const APP_MANIFEST: &str = "app.json";

/// Extension of source files.
const SOURCE_EXTENSION: &str = "al";

/// Outcome of a workspace scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files whose object is now cached.
    pub built: usize,
    /// The scan stopped early; files after the last completed batch were not touched.
    pub cancelled: bool,
    /// Files that could not be read.
    pub skipped: usize,
    /// Files read successfully that declare no object.
    pub without_object: usize,
}

/// Read and build one file.
///
/// Returns `Ok(None)` when the file declares no object.
///
/// # Errors
///
/// Returns `Error::FileNotFound` or `Error::Io` if the file cannot be read.
pub fn analyze_file(root: &Path, relative: &Path, settings: &Settings) -> Result<Option<SourceObject>, Error> {
    let document = TextDocument::read(root, relative)?;
    let object = builder::build_object(&document, settings);
    if object.is_none() {
        tracing::debug!("{}: no object declared", relative.display());
    }
    return Ok(object);
}

/// Every source file under `root` that the config lets through, relative to
/// `root` and sorted.
pub fn discover_sources(root: &Path, config: &Config) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && is_source_file(e.path()))
        .filter_map(|e| return e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|relative| return config.should_scan(&relative.to_string_lossy()))
        .collect();
    sources.sort();
    return sources;
}

/// Walk up from `start` until a directory holding `app.json` or `.aldoc.toml` is found.
///
/// # Errors
///
/// Returns `Error::WorkspaceNotFound` if no ancestor qualifies.
pub fn find_root(start: &Path) -> Result<PathBuf, Error> {
    return start
        .ancestors()
        .find(|dir| return dir.join(APP_MANIFEST).is_file() || dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| return Error::WorkspaceNotFound { start: start.to_path_buf() });
}

/// Whether `path` has the source extension (case-insensitive).
pub fn is_source_file(path: &Path) -> bool {
    return path
        .extension()
        .is_some_and(|ext| return ext.to_string_lossy().eq_ignore_ascii_case(SOURCE_EXTENSION));
}

/// Rebuild one file and swap the result into the cache.
/// A file that no longer exists, or no longer declares an object, loses its entry.
///
/// # Errors
///
/// Returns `Error::Io` if the file exists but cannot be read; the cache entry is left as it was.
pub fn refresh_file(cache: &ObjectCache, root: &Path, relative: &Path, settings: &Settings) -> Result<(), Error> {
    match analyze_file(root, relative, settings) {
        Ok(object) => cache.replace(relative, object),
        Err(Error::FileNotFound { .. }) => {
            cache.remove(relative);
        },
        Err(e) => return Err(e),
    }
    return Ok(());
}

/// Build every discovered file into `cache`.
///
/// Files are processed in batches of `config.batch_size`: each batch is read
/// and built in parallel, batches run one after another, and `cancel` is
/// checked before each batch. A file that fails to read is logged and
/// skipped; it never aborts the batch.
pub fn scan(root: &Path, config: &Config, cache: &ObjectCache, cancel: &AtomicBool) -> ScanReport {
    return scan_observed(root, config, cache, cancel, |report| {
        tracing::debug!("batch stored: {} objects so far", report.built);
    });
}

/// [`scan`], calling `after_batch` with the running totals once each batch
/// has been stored in the cache.
fn scan_observed<F: FnMut(&ScanReport)>(
    root: &Path,
    config: &Config,
    cache: &ObjectCache,
    cancel: &AtomicBool,
    mut after_batch: F,
) -> ScanReport {
    let sources = discover_sources(root, config);
    let mut report = ScanReport::default();

    for batch in sources.chunks(config.batch_size.max(1)) {
        if cancel.load(Ordering::Relaxed) {
            tracing::info!("scan cancelled after {} files", report.built);
            report.cancelled = true;
            return report;
        }

        let results: Vec<(&PathBuf, Result<Option<SourceObject>, Error>)> = batch
            .par_iter()
            .map(|relative| return (relative, analyze_file(root, relative, &config.settings)))
            .collect();

        for (relative, result) in results {
            match result {
                Ok(Some(object)) => {
                    cache.insert(object);
                    report.built = report.built.saturating_add(1);
                },
                Ok(None) => {
                    cache.remove(relative);
                    report.without_object = report.without_object.saturating_add(1);
                },
                Err(e) => {
                    tracing::warn!("skipping {}: {e}", relative.display());
                    report.skipped = report.skipped.saturating_add(1);
                },
            }
        }
        after_batch(&report);
    }

    tracing::info!(
        "scanned {} files: {} objects, {} without object, {} skipped",
        sources.len(),
        report.built,
        report.without_object,
        report.skipped
    );
    return report;
}
