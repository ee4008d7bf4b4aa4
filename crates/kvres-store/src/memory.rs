//! In-memory store client for testing and embedding.
//!
//! [`InMemoryStoreClient`] keeps every key in a `HashMap` behind a `RwLock`
//! and stamps writes with [`VectorClock`]s for a single node. The version
//! check and the insert of a conditional write happen under one write lock,
//! so two writers holding the same version cannot both succeed.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kvres_types::{NodeId, Occurred, VectorClock, Version, VersionedValue};
use tracing::{debug, trace};

use crate::error::{StoreError, StoreResult};
use crate::traits::StoreClient;

/// A store-side value transform, applied on read or before a write.
pub struct ValueTransform<V> {
    f: Arc<dyn Fn(&V) -> V + Send + Sync>,
}

impl<V> ValueTransform<V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&V) -> V + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    pub fn apply(&self, value: &V) -> V {
        (self.f)(value)
    }
}

impl<V> Clone for ValueTransform<V> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<V> Debug for ValueTransform<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueTransform(..)")
    }
}

/// In-memory, HashMap-based [`StoreClient`].
///
/// Data is lost when the client is dropped. The availability switch lets
/// tests simulate an unreachable store: while it is off, every call fails
/// with [`StoreError::Unavailable`].
pub struct InMemoryStoreClient<K, V> {
    node_id: NodeId,
    entries: RwLock<HashMap<K, VersionedValue<V, VectorClock>>>,
    available: AtomicBool,
}

impl<K, V> InMemoryStoreClient<K, V> {
    /// Create an empty store that stamps versions as node `0`.
    pub fn new() -> Self {
        Self::with_node_id(0)
    }

    /// Create an empty store that stamps versions as `node_id`.
    pub fn with_node_id(node_id: NodeId) -> Self {
        Self {
            node_id,
            entries: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Turn the simulated connection on or off.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of keys currently stored.
    ///
    /// Counts through a poisoned lock, so a writer that panicked does not
    /// make a populated store look empty. Reads and writes still fail with
    /// [`StoreError::Internal`] in that state.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key.
    pub fn clear(&self) -> StoreResult<()> {
        self.write_map()?.clear();
        Ok(())
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "in-memory node {} is offline",
                self.node_id
            )))
        }
    }

    fn read_map(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<K, VersionedValue<V, VectorClock>>>> {
        self.check_available()?;
        self.entries
            .read()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {e}")))
    }

    fn write_map(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<K, VersionedValue<V, VectorClock>>>> {
        self.check_available()?;
        self.entries
            .write()
            .map_err(|e| StoreError::Internal(format!("lock poisoned: {e}")))
    }
}

impl<K, V> Default for InMemoryStoreClient<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for InMemoryStoreClient<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryStoreClient")
            .field("node_id", &self.node_id)
            .field("key_count", &self.len())
            .field("available", &self.is_available())
            .finish()
    }
}

impl<K, V> StoreClient for InMemoryStoreClient<K, V>
where
    K: Clone + Debug + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Key = K;
    type Value = V;
    type Version = VectorClock;
    type Transforms = ValueTransform<V>;

    fn find(&self, key: &K) -> StoreResult<Option<VersionedValue<V, VectorClock>>> {
        let map = self.read_map()?;
        let found = map.get(key).cloned();
        trace!(key = ?key, found = found.is_some(), "find");
        Ok(found)
    }

    fn find_with(
        &self,
        key: &K,
        transforms: &ValueTransform<V>,
    ) -> StoreResult<Option<VersionedValue<V, VectorClock>>> {
        let map = self.read_map()?;
        Ok(map
            .get(key)
            .map(|v| VersionedValue::new(transforms.apply(v.value()), v.version().clone())))
    }

    fn put(&self, key: &K, value: V) -> StoreResult<VectorClock> {
        let mut map = self.write_map()?;
        let current = map
            .get(key)
            .map(|v| v.version().clone())
            .unwrap_or_default();
        let next = current.incremented(self.node_id, VectorClock::now_ms())?;
        map.insert(key.clone(), VersionedValue::new(value, next.clone()));
        debug!(key = ?key, version = %next, "put");
        Ok(next)
    }

    fn put_with(
        &self,
        key: &K,
        value: V,
        transforms: &ValueTransform<V>,
    ) -> StoreResult<VectorClock> {
        let transformed = transforms.apply(&value);
        self.put(key, transformed)
    }

    fn put_versioned(
        &self,
        key: &K,
        versioned: VersionedValue<V, VectorClock>,
    ) -> StoreResult<VectorClock> {
        let (value, supplied) = versioned.into_parts();
        let next = supplied.incremented(self.node_id, VectorClock::now_ms())?;

        let mut map = self.write_map()?;
        if let Some(existing) = map.get(key) {
            if next.is_obsoleted_by(existing.version()) {
                debug!(key = ?key, supplied = %supplied, current = %existing.version(), "obsolete write rejected");
                return Err(StoreError::ObsoleteVersion {
                    key: format!("{key:?}"),
                    supplied: supplied.to_string(),
                    current: existing.version().to_string(),
                });
            }
        }
        map.insert(key.clone(), VersionedValue::new(value, next.clone()));
        debug!(key = ?key, version = %next, "conditional put");
        Ok(next)
    }

    fn delete(&self, key: &K) -> StoreResult<bool> {
        let mut map = self.write_map()?;
        let removed = map.remove(key).is_some();
        debug!(key = ?key, removed, "delete");
        Ok(removed)
    }

    fn delete_version(&self, key: &K, version: &VectorClock) -> StoreResult<bool> {
        let mut map = self.write_map()?;
        let removable = match map.get(key) {
            Some(existing) => matches!(
                existing.version().compare(version),
                Occurred::Before | Occurred::Equal
            ),
            None => false,
        };
        if removable {
            map.remove(key);
        }
        debug!(key = ?key, version = %version, removed = removable, "versioned delete");
        Ok(removable)
    }
}
