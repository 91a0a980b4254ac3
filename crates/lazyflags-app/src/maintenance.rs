use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazyflags_core::cache::{ResultCache, resolve_cache_path};
use lazyflags_core::clock::format_rfc3339;
use lazyflags_core::doctor::{DoctorReport, run_doctor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheListing {
    pub path: PathBuf,
    pub rows: Vec<CacheListingRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheListingRow {
    pub key: String,
    pub environments: usize,
    pub failed_environments: usize,
    pub expires: String,
    pub expired: bool,
}

pub fn doctor(fixture_override: Option<&Path>) -> DoctorReport {
    run_doctor(fixture_override)
}

pub fn list_cache() -> Result<CacheListing> {
    let path = resolve_cache_path().context("failed to resolve cache path")?;
    Ok(list_cache_at(ResultCache::open(path.clone()), path))
}

fn list_cache_at(cache: ResultCache, path: PathBuf) -> CacheListing {
    let rows = cache
        .entries()
        .map(|(key, entry)| CacheListingRow {
            key: key.to_string(),
            environments: entry.value.len(),
            failed_environments: entry.value.iter().filter(|result| result.is_failure()).count(),
            expires: format_rfc3339(entry.expires),
            expired: cache.is_expired(entry),
        })
        .collect();

    CacheListing { path, rows }
}

pub fn clear_cache() -> Result<PathBuf> {
    let path = resolve_cache_path().context("failed to resolve cache path")?;
    ResultCache::open(path.clone())
        .clear()
        .with_context(|| format!("failed to clear cache at {}", path.display()))?;
    Ok(path)
}
