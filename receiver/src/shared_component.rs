use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Keyed store handing out one shared instance per configuration identity.
///
/// The collector asks for the traces, metrics and logs side of a receiver
/// separately, but all three must end up on the same running instance. The
/// entry is created on the first request and lives until it is explicitly
/// removed on shutdown, after which the same key can be created again.
#[derive(Debug)]
pub struct SharedComponents<K, V> {
    components: Mutex<HashMap<K, Arc<V>>>,
}

impl<K, V> SharedComponents<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            components: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the instance for `key`, creating it with `create` on a miss.
    ///
    /// `create` runs under the store lock, so concurrent callers for the
    /// same key never build two instances.
    pub fn get_or_add<F>(&self, key: K, create: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        self.components
            .lock()
            .entry(key)
            .or_insert_with(|| Arc::new(create()))
            .clone()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.components.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.components.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.components.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.lock().is_empty()
    }
}

impl<K, V> Default for SharedComponents<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
