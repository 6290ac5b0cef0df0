//! In-process stand-in for the browser's local/session storage. The wider
//! console caches whatever it likes here; this subsystem's one contract with
//! it is that logout wipes the whole thing before any redirect happens.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Cloneable handle over a shared string key/value map.
#[derive(Clone, Default)]
pub struct ClientStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl ClientStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        self.inner.write().insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.inner.write().remove(key)
    }

    /// Wholesale wipe; nothing survives, whoever wrote it.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
