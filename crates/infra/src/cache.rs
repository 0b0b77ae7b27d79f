//! Per-store in-memory entity cache.
//!
//! Each store owns exactly one cache instance; there is no process-wide cache.
//! Readers take the shared lock, writers the exclusive lock, and no lock is ever held
//! across an `.await` (callers finish their storage I/O before touching the cache).

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use billflow_core::Entity;

/// Cache of entities keyed by their id, iterated in id order.
#[derive(Debug)]
pub struct EntityCache<E: Entity> {
    inner: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> EntityCache<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    // A panic while holding the lock cannot leave the map half-written (every
    // mutation is a single map call), so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<E::Id, E>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<E::Id, E>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: &E::Id) -> Option<E> {
        self.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Snapshot of all cached entities.
    pub fn values(&self) -> Vec<E> {
        self.read().values().cloned().collect()
    }

    /// First cached entity matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&E) -> bool) -> Option<E> {
        self.read().values().find(|e| predicate(e)).cloned()
    }

    /// All cached entities matching `predicate`.
    pub fn filter(&self, predicate: impl Fn(&E) -> bool) -> Vec<E> {
        self.read()
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    /// Insert or replace an entity.
    pub fn insert(&self, entity: E) {
        self.write().insert(*entity.id(), entity);
    }

    /// Insert many entities under a single write lock.
    pub fn extend(&self, entities: impl IntoIterator<Item = E>) {
        let mut map = self.write();
        for entity in entities {
            map.insert(*entity.id(), entity);
        }
    }

    pub fn remove(&self, id: &E::Id) -> Option<E> {
        self.write().remove(id)
    }
}

impl<E: Entity> Default for EntityCache<E> {
    fn default() -> Self {
        Self::new()
    }
}
