use fnv::FnvHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

/// Concurrent get-or-create map from a name to an interned entity
///
/// Lookups take the read lock only. Creation re-checks under the write lock,
/// so two threads interning the same name concurrently observe the same
/// `Arc` and exactly one id is consumed.
///
/// Ids start at 1; id 0 is reserved for the synthetic root execution.
#[derive(Debug)]
pub struct EntityRegistry<T> {
    entities: RwLock<FnvHashMap<String, Arc<T>>>,
    next_id: AtomicU32,
}

impl<T> Default for EntityRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityRegistry<T> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(FnvHashMap::default()),
            next_id: AtomicU32::new(1),
        }
    }

    /// Look up an entity by its named identifier
    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        let entities = self.entities.read().unwrap_or_else(|e| e.into_inner());
        entities.get(name).cloned()
    }

    /// Return the entity registered under `name`, creating it if needed
    ///
    /// `create` receives the freshly assigned id and runs at most once per
    /// name.
    pub fn get_or_create(&self, name: &str, create: impl FnOnce(u32) -> T) -> Arc<T> {
        if let Some(existing) = self.lookup(name) {
            return existing;
        }

        let mut entities = self.entities.write().unwrap_or_else(|e| e.into_inner());
        entities
            .entry(name.to_string())
            .or_insert_with(|| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                Arc::new(create(id))
            })
            .clone()
    }

    /// Number of distinct entities
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entities, ordered by id
    pub fn entities(&self) -> Vec<Arc<T>>
    where
        T: HasId,
    {
        let mut all: Vec<Arc<T>> = self
            .entities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|e| e.id());
        all
    }
}

/// Entities carrying a registry-assigned id
pub trait HasId {
    fn id(&self) -> u32;
}
