use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::clock::{Clock, SystemClock};
use crate::model::FlagResult;

pub const CACHE_TTL: Duration = Duration::seconds(60);
const CACHE_DIR_NAME: &str = "LazyFlags";
const CACHE_FILE_NAME: &str = ".cache";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub application_id: String,
    pub profile_id: String,
}

impl CacheKey {
    pub fn new(application_id: impl Into<String>, profile_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            profile_id: profile_id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.application_id, self.profile_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Vec<FlagResult>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires: OffsetDateTime,
}

impl CacheEntry {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not resolve user cache directory")]
    CacheDirectoryUnavailable,
    #[error("failed to write cache at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize cache: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to remove cache at {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheFileStatus {
    Missing,
    Valid { entries: usize },
    Corrupt { message: String },
}

pub fn resolve_cache_path() -> Result<PathBuf, CacheError> {
    let base_dirs = BaseDirs::new().ok_or(CacheError::CacheDirectoryUnavailable)?;
    Ok(base_dirs
        .cache_dir()
        .join(CACHE_DIR_NAME)
        .join(CACHE_FILE_NAME))
}

pub fn inspect_cache_file(path: &Path) -> CacheFileStatus {
    match fs::read(path) {
        Ok(raw) => match serde_json::from_slice::<BTreeMap<String, CacheEntry>>(&raw) {
            Ok(entries) => CacheFileStatus::Valid {
                entries: entries.len(),
            },
            Err(error) => CacheFileStatus::Corrupt {
                message: error.to_string(),
            },
        },
        Err(error) if error.kind() == io::ErrorKind::NotFound => CacheFileStatus::Missing,
        Err(error) => CacheFileStatus::Corrupt {
            message: error.to_string(),
        },
    }
}

/// Fetch results keyed by `app:profile`, each valid for [`CACHE_TTL`] from
/// the moment it was added. Every `add` rewrites the whole table to disk.
pub struct ResultCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, CacheEntry>,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ResultCache {
    /// Loads the table at `path`. A missing or unreadable file yields an
    /// empty cache.
    pub fn open(path: PathBuf) -> Self {
        Self::open_with_clock(path, Box::new(SystemClock))
    }

    pub fn open_with_clock(path: PathBuf, clock: Box<dyn Clock>) -> Self {
        let entries = load_entries(&path);
        Self {
            path: Some(path),
            entries,
            clock,
        }
    }

    /// Opens the cache under the user cache directory, falling back to a
    /// memory-only cache when that directory cannot be resolved.
    pub fn open_default() -> Self {
        match resolve_cache_path() {
            Ok(path) => Self::open(path),
            Err(error) => {
                warn!("{error}; result cache is memory-only");
                Self::in_memory(Box::new(SystemClock))
            }
        }
    }

    pub fn in_memory(clock: Box<dyn Clock>) -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            clock,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Vec<FlagResult>> {
        let key = key.to_string();
        let now = self.clock.now();
        let expired = self.entries.get(&key)?.is_expired(now);
        if expired {
            debug!("cache entry '{key}' expired");
            self.entries.remove(&key);
            return None;
        }
        self.entries.get(&key).map(|entry| entry.value.clone())
    }

    /// Stores `value` until `now + CACHE_TTL` and persists the table. The
    /// in-memory entry is kept even when the write fails.
    pub fn add(&mut self, key: &CacheKey, value: Vec<FlagResult>) -> Result<(), CacheError> {
        let now = self.clock.now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires: now + CACHE_TTL,
            },
        );
        self.persist()
    }

    /// All entries, expired or not, without evicting anything.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry))
    }

    pub fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.is_expired(self.clock.now())
    }

    pub fn clear(&mut self) -> Result<(), CacheError> {
        self.entries.clear();
        let Some(path) = &self.path else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Remove {
                path: path.clone(),
                source,
            }),
        }
    }

    fn persist(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let serialized = serde_json::to_vec(&self.entries).map_err(CacheError::Serialize)?;
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, serialized).map_err(|source| CacheError::Write {
            path: temp_path.clone(),
            source,
        })?;

        fs::rename(&temp_path, path).map_err(|source| CacheError::Write {
            path: path.clone(),
            source,
        })?;

        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, CacheEntry> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(error) => {
            if error.kind() != io::ErrorKind::NotFound {
                warn!("failed to read cache at {}: {error}", path.display());
            }
            return BTreeMap::new();
        }
    };

    match serde_json::from_slice(&raw) {
        Ok(entries) => entries,
        Err(error) => {
            warn!("ignoring corrupt cache at {}: {error}", path.display());
            BTreeMap::new()
        }
    }
}
