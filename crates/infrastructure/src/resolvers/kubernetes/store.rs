use kube::runtime::watcher::Event;
use kube::{Resource, ResourceExt};
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tsdns_proxy_domain::DomainError;

/// Watched objects keyed by `namespace/name`, plus one secondary index.
///
/// Mutated only by the collection's watch task; read concurrently by lookups.
pub struct IndexedStore<T, K> {
    name: &'static str,
    index_fn: fn(&T) -> Vec<K>,
    state: RwLock<StoreState<T, K>>,
    synced: watch::Sender<bool>,
}

struct StoreState<T, K> {
    objects: FxHashMap<String, StoredObject<T, K>>,
    index: FxHashMap<K, FxHashSet<String>>,
    relist: Option<Vec<T>>,
}

struct StoredObject<T, K> {
    object: Arc<T>,
    index_keys: Vec<K>,
}

impl<T, K> Default for StoreState<T, K> {
    fn default() -> Self {
        Self {
            objects: FxHashMap::default(),
            index: FxHashMap::default(),
            relist: None,
        }
    }
}

impl<T, K> StoreState<T, K>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, key: String, object: T, index_fn: fn(&T) -> Vec<K>) {
        self.remove(&key);
        let index_keys = index_fn(&object);
        for index_key in &index_keys {
            self.index
                .entry(index_key.clone())
                .or_default()
                .insert(key.clone());
        }
        self.objects.insert(
            key,
            StoredObject {
                object: Arc::new(object),
                index_keys,
            },
        );
    }

    fn remove(&mut self, key: &str) {
        let Some(previous) = self.objects.remove(key) else {
            return;
        };
        for index_key in previous.index_keys {
            if let Some(keys) = self.index.get_mut(&index_key) {
                keys.remove(key);
                if keys.is_empty() {
                    self.index.remove(&index_key);
                }
            }
        }
    }
}

impl<T, K> IndexedStore<T, K>
where
    T: Resource,
    K: Eq + Hash + Clone,
{
    pub fn new(name: &'static str, index_fn: fn(&T) -> Vec<K>) -> Self {
        Self {
            name,
            index_fn,
            state: RwLock::new(StoreState::default()),
            synced: watch::Sender::new(false),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, object: T) -> Result<(), DomainError> {
        let key = object_key(&object);
        self.write()?.insert(key, object, self.index_fn);
        Ok(())
    }

    pub fn delete(&self, object: &T) -> Result<(), DomainError> {
        self.write()?.remove(&object_key(object));
        Ok(())
    }

    /// Swaps the whole content for a fresh listing and marks the store synced.
    pub fn replace_all(&self, objects: Vec<T>) -> Result<(), DomainError> {
        let mut fresh = StoreState::default();
        for object in objects {
            fresh.insert(object_key(&object), object, self.index_fn);
        }
        *self.write()? = fresh;
        self.synced.send_replace(true);
        Ok(())
    }

    pub fn handle_event(&self, event: Event<T>) -> Result<(), DomainError> {
        match event {
            Event::Apply(object) => self.apply(object),
            Event::Delete(object) => self.delete(&object),
            Event::Init => {
                self.write()?.relist = Some(Vec::new());
                Ok(())
            }
            Event::InitApply(object) => {
                let mut state = self.write()?;
                match state.relist.as_mut() {
                    Some(relist) => relist.push(object),
                    None => {
                        let key = object_key(&object);
                        state.insert(key, object, self.index_fn);
                    }
                }
                Ok(())
            }
            Event::InitDone => {
                let relist = self.write()?.relist.take().unwrap_or_default();
                self.replace_all(relist)
            }
        }
    }

    pub fn by_index(&self, index_key: &K) -> Result<Vec<Arc<T>>, DomainError> {
        let state = self.read()?;
        let Some(keys) = state.index.get(index_key) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| state.objects.get(key))
            .map(|stored| Arc::clone(&stored.object))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.read().map(|state| state.objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_synced(&self) -> bool {
        *self.synced.borrow()
    }

    /// Resolves once the initial listing has been stored.
    pub async fn wait_synced(&self) {
        let mut synced = self.synced.subscribe();
        let _ = synced.wait_for(|synced| *synced).await;
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState<T, K>>, DomainError> {
        self.state
            .read()
            .map_err(|_| DomainError::IndexUnavailable(self.name))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState<T, K>>, DomainError> {
        self.state
            .write()
            .map_err(|_| DomainError::IndexUnavailable(self.name))
    }
}

pub fn object_key<T: Resource>(object: &T) -> String {
    format!(
        "{}/{}",
        object.namespace().unwrap_or_default(),
        object.name_any()
    )
}
