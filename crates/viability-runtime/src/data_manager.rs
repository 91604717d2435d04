//! TTL-cached data manager.
//!
//! Wraps [`load_dataset`] with a cache keyed by the data directory and a
//! modification signature of its export files. Callers use
//! [`DataManager::get_data`] to obtain a fresh-or-cached [`Dataset`]; the
//! manager reloads when the TTL expires, when any export changes, or when
//! asked to.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use viability_data::clients::CLIENT_REGISTRY_FILE;
use viability_data::reader::{find_transaction_files, load_dataset, Dataset};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds (one hour).
pub const DEFAULT_CACHE_TTL_SECS: u64 = viability_core::settings::DEFAULT_CACHE_TTL_SECS;

// ── FileStamp / ModificationSignature ─────────────────────────────────────────

/// Identity of one input file at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Stamps of every input file in a data directory, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationSignature(Vec<FileStamp>);

impl ModificationSignature {
    /// Stamp the client registry and every transaction export in `data_dir`.
    /// Files that vanish while being stamped are left out.
    pub fn capture(data_dir: &Path) -> Self {
        let mut paths = find_transaction_files(data_dir);
        let registry = data_dir.join(CLIENT_REGISTRY_FILE);
        if registry.is_file() {
            paths.push(registry);
        }
        paths.sort();

        let stamps = paths
            .into_iter()
            .filter_map(|path| {
                let meta = std::fs::metadata(&path).ok()?;
                Some(FileStamp {
                    len: meta.len(),
                    modified: meta.modified().ok(),
                    path,
                })
            })
            .collect();

        Self(stamps)
    }

    pub fn files(&self) -> &[FileStamp] {
        &self.0
    }
}

/// Cache key: which directory, in which state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub data_dir: PathBuf,
    pub signature: ModificationSignature,
}

impl CacheKey {
    pub fn capture(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            signature: ModificationSignature::capture(data_dir),
        }
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

struct CacheEntry {
    key: CacheKey,
    dataset: Dataset,
    loaded_at: Instant,
}

impl CacheEntry {
    /// `true` when the entry matches `key` and is younger than `ttl`.
    fn is_valid_for(&self, key: &CacheKey, ttl: Duration) -> bool {
        self.key == *key && self.loaded_at.elapsed() < ttl
    }
}

/// TTL-cached wrapper around [`load_dataset`].
///
/// # Example
/// ```no_run
/// use viability_runtime::data_manager::DataManager;
///
/// let mut mgr = DataManager::new(3600, "dados_api");
/// let dataset = mgr.get_data(false);
/// println!("transactions: {}", dataset.transactions.len());
/// ```
pub struct DataManager {
    /// Maximum age of cached data before it is considered stale.
    cache_ttl: Duration,
    /// Directory scanned for exports.
    data_dir: PathBuf,
    cache: Option<CacheEntry>,
    /// Human-readable description of the last load problem.
    last_error: Option<String>,
}

impl DataManager {
    /// Create a new manager.
    ///
    /// # Parameters
    /// - `cache_ttl_secs` – seconds before cached data is considered stale.
    /// - `data_dir`       – directory holding the export files.
    pub fn new(cache_ttl_secs: u64, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_dir: data_dir.into(),
            cache: None,
            last_error: None,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the dataset, reusing the cache while it is valid.
    ///
    /// When `force_refresh` is `true` the cache is bypassed.
    pub fn get_data(&mut self, force_refresh: bool) -> &Dataset {
        let key = CacheKey::capture(&self.data_dir);

        let entry = match self.cache.take() {
            Some(entry) if !force_refresh && entry.is_valid_for(&key, self.cache_ttl) => {
                tracing::debug!("returning cached dataset");
                entry
            }
            _ => {
                let dataset = load_dataset(&self.data_dir);
                tracing::debug!(
                    transactions = dataset.transactions.len(),
                    files = key.signature.files().len(),
                    "dataset cache updated"
                );
                self.last_error = load_problem(&dataset);
                CacheEntry {
                    key,
                    dataset,
                    loaded_at: Instant::now(),
                }
            }
        };

        &self.cache.insert(entry).dataset
    }

    /// Discard the current cache, forcing the next [`get_data`](Self::get_data)
    /// call to reload.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        tracing::debug!("cache invalidated");
    }

    /// Age of the current cache entry, or `None` if nothing is cached.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache.as_ref().map(|entry| entry.loaded_at.elapsed())
    }

    /// Description of what went wrong during the last load, or `None`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Summarise skipped files, or report that nothing could be loaded.
fn load_problem(dataset: &Dataset) -> Option<String> {
    if dataset.is_empty() {
        return Some(format!(
            "no transactions recovered from {}",
            dataset.data_dir.display()
        ));
    }
    let failed = &dataset.report.files_failed;
    if failed.is_empty() {
        None
    } else {
        Some(format!("{} export file(s) could not be read", failed.len()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
