use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of a persisted type cache. These never fail a query path; the
/// registry falls back to a live catalog query.
#[derive(Debug, Error)]
pub enum TypeCacheError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] serde_json::Error),
}

/// Persisted oid → type-name cache keyed by a connection fingerprint.
pub trait TypeCacheStore: Send + Sync {
    /// Load the cached map, or `None` when nothing was stored yet.
    fn load(&self, fingerprint: &str) -> Result<Option<HashMap<u32, String>>, TypeCacheError>;

    /// Store a full replacement map for the fingerprint.
    fn store(
        &self,
        fingerprint: &str,
        types: &HashMap<u32, String>,
    ) -> Result<(), TypeCacheError>;

    /// Drop the cached map for the fingerprint.
    fn clear(&self, fingerprint: &str) -> Result<(), TypeCacheError>;
}

/// File-per-fingerprint JSON cache.
///
/// Writes go to a temp file first and are renamed into place, so concurrent
/// readers always observe a fully formed map.
#[derive(Debug, Clone)]
pub struct JsonFileTypeCache {
    directory: PathBuf,
}

impl JsonFileTypeCache {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path(&self, fingerprint: &str) -> PathBuf {
        self.directory.join(format!("{fingerprint}.json"))
    }
}

impl TypeCacheStore for JsonFileTypeCache {
    fn load(&self, fingerprint: &str) -> Result<Option<HashMap<u32, String>>, TypeCacheError> {
        match fs::read_to_string(self.path(fingerprint)) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(
        &self,
        fingerprint: &str,
        types: &HashMap<u32, String>,
    ) -> Result<(), TypeCacheError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path(fingerprint);
        let tmp = self.directory.join(format!("{fingerprint}.json.tmp"));
        fs::write(&tmp, serde_json::to_vec(types)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn clear(&self, fingerprint: &str) -> Result<(), TypeCacheError> {
        match fs::remove_file(self.path(fingerprint)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
