//! Fingerprint-keyed load cache.
//!
//! Wraps bundle reading and [`RecordLoader::load`] behind a single-entry
//! cache keyed by the bundle fingerprint: format, content, and any file name
//! that becomes a table name. Callers use [`DataManager::get_or_load`] to
//! obtain a shared [`LoadOutcome`]; the same bundle is only parsed once no
//! matter which source handed it over.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use discount_core::error::Result;
use discount_data::loader::{LoadOutcome, RecordLoader};
use discount_data::reader::{BundleFingerprint, BundleSnapshot};

// ── BundleSource ──────────────────────────────────────────────────────────────

/// Where a bundle came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// The bundled default dataset.
    Default(PathBuf),
    /// A file the user supplied.
    Upload(PathBuf),
}

impl BundleSource {
    pub fn path(&self) -> &Path {
        match self {
            BundleSource::Default(path) | BundleSource::Upload(path) => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BundleSource::Default(_) => "default",
            BundleSource::Upload(_) => "upload",
        }
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

struct CacheEntry {
    fingerprint: BundleFingerprint,
    outcome: Arc<LoadOutcome>,
    loaded_at: Instant,
}

/// Single-entry load cache.
///
/// # Example
/// ```no_run
/// use std::path::PathBuf;
/// use discount_runtime::data_manager::{BundleSource, DataManager};
///
/// let mut mgr = DataManager::new();
/// let source = BundleSource::Upload(PathBuf::from("insurers.xlsx"));
/// let outcome = mgr.get_or_load(&source).unwrap();
/// println!("records: {}", outcome.collection.len());
/// ```
#[derive(Default)]
pub struct DataManager {
    cache: Option<CacheEntry>,
    cache_hits: u64,
    cache_misses: u64,
    /// Human-readable description of the last load error.
    last_error: Option<String>,
}

impl DataManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the load outcome for `source`, parsing it only when its
    /// fingerprint differs from the cached entry.
    ///
    /// The bytes are read once; the fingerprint and the parse both use them.
    ///
    /// On failure the previous entry stays cached and the error is kept in
    /// [`last_error`](Self::last_error).
    pub fn get_or_load(&mut self, source: &BundleSource) -> Result<Arc<LoadOutcome>> {
        let path = source.path();

        let snapshot = match BundleSnapshot::read(path) {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.record_failure(source, e)),
        };
        let fingerprint = snapshot.fingerprint();

        if let Some(entry) = self.cache.as_ref().filter(|e| e.fingerprint == fingerprint) {
            self.cache_hits += 1;
            tracing::debug!(
                source = source.kind(),
                fingerprint = %fingerprint,
                "returning cached load outcome"
            );
            return Ok(Arc::clone(&entry.outcome));
        }

        self.cache_misses += 1;
        let bundle = match snapshot.parse() {
            Ok(bundle) => bundle,
            Err(e) => return Err(self.record_failure(source, e)),
        };

        let outcome = Arc::new(RecordLoader::load(&bundle));
        tracing::debug!(
            source = source.kind(),
            path = %path.display(),
            fingerprint = %fingerprint,
            records = outcome.collection.len(),
            "load cache updated"
        );

        self.cache = Some(CacheEntry {
            fingerprint,
            outcome: Arc::clone(&outcome),
            loaded_at: Instant::now(),
        });
        self.last_error = None;
        Ok(outcome)
    }

    /// Drop the cached entry, forcing the next call to parse again.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        tracing::debug!("cache invalidated");
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses
    }

    /// Fingerprint of the cached bundle, if any.
    pub fn cached_fingerprint(&self) -> Option<&BundleFingerprint> {
        self.cache.as_ref().map(|e| &e.fingerprint)
    }

    /// Age of the current cache entry, or `None` if nothing is cached.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache.as_ref().map(|e| e.loaded_at.elapsed())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn record_failure(
        &mut self,
        source: &BundleSource,
        error: discount_core::DashboardError,
    ) -> discount_core::DashboardError {
        tracing::warn!(
            source = source.kind(),
            path = %source.path().display(),
            error = %error,
            "bundle load failed; keeping previous cache entry"
        );
        self.last_error = Some(error.to_string());
        error
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bundle(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    // ── cache miss on first call ──────────────────────────────────────────

    #[test]
    fn test_cache_miss_on_first_call() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let mut mgr = DataManager::new();

        assert!(mgr.cached_fingerprint().is_none());
        assert!(mgr.cache_age().is_none());

        let outcome = mgr.get_or_load(&BundleSource::Upload(path)).unwrap();
        assert_eq!(outcome.collection.len(), 1);
        assert_eq!(mgr.cache_misses(), 1);
        assert_eq!(mgr.cache_hits(), 0);
        assert!(mgr.cached_fingerprint().is_some());
    }

    // ── same content hits ─────────────────────────────────────────────────

    #[test]
    fn test_same_content_is_a_hit() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let mut mgr = DataManager::new();

        let first = mgr.get_or_load(&BundleSource::Upload(path.clone())).unwrap();
        let second = mgr.get_or_load(&BundleSource::Upload(path)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mgr.cache_hits(), 1);
        assert_eq!(mgr.cache_misses(), 1);
    }

    #[test]
    fn test_source_kind_is_not_part_of_the_key() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let mut mgr = DataManager::new();

        mgr.get_or_load(&BundleSource::Default(path.clone())).unwrap();
        mgr.get_or_load(&BundleSource::Upload(path)).unwrap();

        assert_eq!(mgr.cache_hits(), 1);
    }

    // ── same bytes, different table name misses ───────────────────────────

    #[test]
    fn test_renamed_csv_reloads_under_new_insurer() {
        let dir = TempDir::new().unwrap();
        let acme = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let zeta = write_bundle(&dir, "Zeta.csv", "Discount\n0.5\n");
        let mut mgr = DataManager::new();

        let first = mgr.get_or_load(&BundleSource::Upload(acme)).unwrap();
        let second = mgr.get_or_load(&BundleSource::Upload(zeta)).unwrap();

        assert_eq!(first.collection.insurers(), vec!["Acme"]);
        assert_eq!(second.collection.insurers(), vec!["Zeta"]);
        assert_eq!(mgr.cache_misses(), 2);
        assert_eq!(mgr.cache_hits(), 0);
    }

    #[test]
    fn test_delimiter_change_reloads() {
        let dir = TempDir::new().unwrap();
        let content = "Discount\tBand\n0.5\tx\n";
        let csv = write_bundle(&dir, "Acme.csv", content);
        let tsv = write_bundle(&dir, "Acme.tsv", content);
        let mut mgr = DataManager::new();

        // Comma-separated, the tab-joined header leaves no discount column.
        let as_csv = mgr.get_or_load(&BundleSource::Upload(csv)).unwrap();
        let as_tsv = mgr.get_or_load(&BundleSource::Upload(tsv)).unwrap();

        assert!(as_csv.collection.is_empty());
        assert_eq!(as_tsv.collection.len(), 1);
        assert_eq!(mgr.cache_misses(), 2);
    }

    // ── changed content misses ────────────────────────────────────────────

    #[test]
    fn test_changed_content_reloads() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let source = BundleSource::Upload(path.clone());
        let mut mgr = DataManager::new();

        mgr.get_or_load(&source).unwrap();
        let before = mgr.cached_fingerprint().cloned();

        std::fs::write(&path, "Discount\n0.5\n0.9\n").unwrap();
        let outcome = mgr.get_or_load(&source).unwrap();

        assert_eq!(outcome.collection.len(), 2);
        assert_eq!(mgr.cache_misses(), 2);
        assert_ne!(mgr.cached_fingerprint().cloned(), before);
    }

    // ── failure keeps previous entry ──────────────────────────────────────

    #[test]
    fn test_failed_load_keeps_previous_entry() {
        let dir = TempDir::new().unwrap();
        let good = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let bad = write_bundle(&dir, "broken.xlsx", "not a workbook");
        let mut mgr = DataManager::new();

        mgr.get_or_load(&BundleSource::Upload(good.clone())).unwrap();
        let before = mgr.cached_fingerprint().cloned();

        assert!(mgr.get_or_load(&BundleSource::Upload(bad)).is_err());
        assert_eq!(mgr.cached_fingerprint().cloned(), before);
        assert!(mgr.last_error().is_some());

        // The old content is still served from cache.
        mgr.get_or_load(&BundleSource::Upload(good)).unwrap();
        assert_eq!(mgr.cache_hits(), 1);
        assert!(mgr.last_error().is_some());
    }

    #[test]
    fn test_missing_bundle_is_error() {
        let dir = TempDir::new().unwrap();
        let mut mgr = DataManager::new();
        let result = mgr.get_or_load(&BundleSource::Default(dir.path().join("missing.xlsx")));

        assert!(result.is_err());
        assert!(mgr.last_error().unwrap().contains("missing.xlsx"));
        assert_eq!(mgr.cache_misses(), 0);
    }

    // ── manual cache invalidation ─────────────────────────────────────────

    #[test]
    fn test_invalidate_cache() {
        let dir = TempDir::new().unwrap();
        let path = write_bundle(&dir, "Acme.csv", "Discount\n0.5\n");
        let source = BundleSource::Upload(path);
        let mut mgr = DataManager::new();

        mgr.get_or_load(&source).unwrap();
        mgr.invalidate_cache();
        assert!(mgr.cached_fingerprint().is_none());
        assert!(mgr.cache_age().is_none());

        mgr.get_or_load(&source).unwrap();
        assert_eq!(mgr.cache_misses(), 2);
    }

    #[test]
    fn test_bundle_source_accessors() {
        let source = BundleSource::Default(PathBuf::from("a.xlsx"));
        assert_eq!(source.path(), Path::new("a.xlsx"));
        assert_eq!(source.kind(), "default");
        assert_eq!(BundleSource::Upload(PathBuf::from("b")).kind(), "upload");
    }
}
