use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

/// Stable identity of a connection target, used to key the type caches.
#[must_use]
pub fn fingerprint(config: &str) -> String {
    let digest = Sha256::digest(config.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[derive(Debug, Default)]
struct RegistryInner {
    fingerprint: Option<String>,
    types: HashMap<u32, String>,
    store_checked: bool,
}

/// Shared oid → type-name lookup for one database identity.
///
/// Cloning hands out another handle to the same map, so sessions pointed at
/// the same database can share one registry and avoid repeated catalog
/// queries.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the registry to a database identity, resetting it when the
    /// identity changed since the last bind.
    pub(crate) fn bind(&self, fingerprint: &str) {
        let mut inner = self.write();
        if inner.fingerprint.as_deref() != Some(fingerprint) {
            *inner = RegistryInner {
                fingerprint: Some(fingerprint.to_string()),
                ..RegistryInner::default()
            };
        }
    }

    /// Look up the type name for an oid.
    #[must_use]
    pub fn lookup(&self, oid: u32) -> Option<String> {
        self.read().types.get(&oid).cloned()
    }

    /// True when every given oid is already known.
    pub(crate) fn contains_all(&self, oids: impl IntoIterator<Item = u32>) -> bool {
        let inner = self.read();
        if inner.types.is_empty() {
            return false;
        }
        oids.into_iter().all(|oid| inner.types.contains_key(&oid))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().types.is_empty()
    }

    pub(crate) fn store_checked(&self) -> bool {
        self.read().store_checked
    }

    pub(crate) fn mark_store_checked(&self) {
        self.write().store_checked = true;
    }

    /// Replace the in-process map, e.g. after a catalog query.
    pub(crate) fn replace(&self, types: HashMap<u32, String>) {
        self.write().types = types;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
