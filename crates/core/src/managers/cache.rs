//! Keyed cache of shared runtime values.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A get-or-create cache of `Arc<Mutex<T>>` values keyed by definition id.
///
/// Invalidation drops the cached value; any live `Arc` holders keep their
/// clone until they release it, but subsequent lookups rebuild fresh.
pub struct RuntimeCache<T> {
    entries: Mutex<HashMap<Uuid, Arc<Mutex<T>>>>,
}

impl<T> RuntimeCache<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the cached value for `id`, building one with `build` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the builder's error; nothing is cached on failure.
    pub async fn get_or_create<E>(
        &self,
        id: Uuid,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<Mutex<T>>, E> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.get(&id) {
            return Ok(Arc::clone(existing));
        }
        let value = Arc::new(Mutex::new(build()?));
        entries.insert(id, Arc::clone(&value));
        Ok(value)
    }

    /// Fetch without building. Returns `None` on a miss.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<T>>> {
        self.entries.lock().await.get(&id).map(Arc::clone)
    }

    /// Drop the cached value for `id`. Returns whether an entry existed.
    pub async fn invalidate(&self, id: Uuid) -> bool {
        self.entries.lock().await.remove(&id).is_some()
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl<T> Default for RuntimeCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
