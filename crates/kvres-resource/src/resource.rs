use std::fmt;
use std::sync::Arc;

use kvres_store::StoreClient;
use kvres_types::VersionedValue;
use tracing::trace;

use crate::capability::{
    ConditionalDeletable, DeletableResource, Gettable, ReadableResource, Settable,
    WritableResource,
};
use crate::deferred::Deferred;
use crate::keyed::KeyedStore;
use crate::merger::{MergePolicy, ResourceMerger};

/// One key of a store, with every operation returned as a cold
/// [`Deferred`].
///
/// Cloning is cheap and the clone addresses the same key of the same store.
/// A resource keeps no state of its own: two resources for the same key see
/// exactly what the store shows them.
pub struct Resource<S: StoreClient> {
    keyed: KeyedStore<S>,
}

impl<S: StoreClient + 'static> Resource<S> {
    pub fn new(store: Arc<S>, key: S::Key) -> Self {
        Self::from_keyed(KeyedStore::new(store, key))
    }

    pub fn from_keyed(keyed: KeyedStore<S>) -> Self {
        Self { keyed }
    }

    pub fn key(&self) -> &S::Key {
        self.keyed.key()
    }

    /// The blocking view of the same key.
    pub fn keyed(&self) -> &KeyedStore<S> {
        &self.keyed
    }

    /// Read the value and its version. Fails with "not found" if absent.
    pub fn get(&self) -> Deferred<VersionedValue<S::Value, S::Version>> {
        let keyed = self.keyed.clone();
        Deferred::new(move || {
            trace!(key = ?keyed.key(), "resource get");
            Ok(keyed.get()?)
        })
    }

    pub fn get_value(&self) -> Deferred<S::Value> {
        let keyed = self.keyed.clone();
        Deferred::new(move || {
            trace!(key = ?keyed.key(), "resource get_value");
            Ok(keyed.get_value()?)
        })
    }

    pub fn get_value_or(&self, default: S::Value) -> Deferred<S::Value> {
        let keyed = self.keyed.clone();
        Deferred::new(move || {
            trace!(key = ?keyed.key(), "resource get_value_or");
            Ok(keyed.get_value_or(default)?)
        })
    }

    /// Conditional write. Fails with an obsolete-version error if the key
    /// moved past `versioned`'s version; otherwise yields the new version.
    pub fn write(&self, versioned: VersionedValue<S::Value, S::Version>) -> Deferred<S::Version> {
        let keyed = self.keyed.clone();
        Deferred::new(move || Ok(keyed.put_versioned(versioned)?))
    }

    /// Conditional write that yields `false` instead of failing when stale.
    pub fn write_if_not_obsolete(
        &self,
        versioned: VersionedValue<S::Value, S::Version>,
    ) -> Deferred<bool> {
        let keyed = self.keyed.clone();
        Deferred::new(move || Ok(keyed.put_if_not_obsolete(versioned)?))
    }

    /// Unconditional write.
    pub fn set(&self, value: S::Value) -> Deferred<S::Version> {
        let keyed = self.keyed.clone();
        Deferred::new(move || Ok(keyed.put(value)?))
    }

    /// Unconditional delete. Yields `false` if the key did not exist.
    pub fn delete(&self) -> Deferred<bool> {
        let keyed = self.keyed.clone();
        Deferred::new(move || Ok(keyed.delete()?))
    }

    /// Delete only if the stored version is not newer than `version`.
    pub fn delete_version(&self, version: S::Version) -> Deferred<bool> {
        let keyed = self.keyed.clone();
        Deferred::new(move || Ok(keyed.delete_version(&version)?))
    }

    /// Read-modify-write helper that reports the first conflict.
    pub fn merger(&self) -> ResourceMerger<Self> {
        self.merger_with(MergePolicy::default())
    }

    pub fn merger_with(&self, policy: MergePolicy) -> ResourceMerger<Self> {
        ResourceMerger::new(self.clone(), policy)
    }
}

impl<S: StoreClient> Clone for Resource<S> {
    fn clone(&self) -> Self {
        Self {
            keyed: self.keyed.clone(),
        }
    }
}

impl<S: StoreClient> fmt::Debug for Resource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", self.keyed.key())
            .finish()
    }
}

impl<S: StoreClient + 'static> ReadableResource for Resource<S> {
    type Value = S::Value;
    type Version = S::Version;

    fn get(&self) -> Deferred<VersionedValue<S::Value, S::Version>> {
        Resource::get(self)
    }
}

impl<S: StoreClient + 'static> WritableResource<VersionedValue<S::Value, S::Version>>
    for Resource<S>
{
    type Output = S::Version;

    fn write(&self, versioned: VersionedValue<S::Value, S::Version>) -> Deferred<S::Version> {
        Resource::write(self, versioned)
    }
}

impl<S: StoreClient + 'static> DeletableResource for Resource<S> {
    fn delete(&self) -> Deferred<bool> {
        Resource::delete(self)
    }
}

impl<S: StoreClient + 'static> ConditionalDeletable<S::Version> for Resource<S> {
    fn delete_version(&self, version: S::Version) -> Deferred<bool> {
        Resource::delete_version(self, version)
    }
}

impl<S: StoreClient + 'static> Gettable for Resource<S> {
    type Value = S::Value;

    fn get_value(&self) -> Deferred<S::Value> {
        Resource::get_value(self)
    }

    fn get_value_or(&self, default: S::Value) -> Deferred<S::Value> {
        Resource::get_value_or(self, default)
    }
}

impl<S: StoreClient + 'static> Settable<S::Value> for Resource<S> {
    type Output = S::Version;

    fn set(&self, value: S::Value) -> Deferred<S::Version> {
        Resource::set(self, value)
    }
}

#[cfg(test)]
mod tests {
    use kvres_store::InMemoryStoreClient;
    use kvres_types::{Version, VectorClock};

    use super::*;

    type Store = InMemoryStoreClient<String, i64>;

    fn resource(store: &Arc<Store>, key: &str) -> Resource<Store> {
        Resource::new(Arc::clone(store), key.to_string())
    }

    // ---- Test 1: write then get round-trips ----
    #[test]
    fn write_then_get() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store, "k");
        let v1 = r.write(VersionedValue::unversioned(42)).wait().unwrap();
        let read = r.get().wait().unwrap();
        assert_eq!(read, VersionedValue::new(42, v1));
    }

    // ---- Test 2: stale write fails, non-throwing variant says false ----
    #[test]
    fn stale_write_signals_both_ways() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store, "k");
        let v0 = VectorClock::new();
        r.write(VersionedValue::new(1, v0.clone())).wait().unwrap();

        let err = r.write(VersionedValue::new(2, v0.clone())).wait().unwrap_err();
        assert!(err.is_obsolete(), "expected obsolete, got {err}");
        assert!(!r
            .write_if_not_obsolete(VersionedValue::new(2, v0))
            .wait()
            .unwrap());
        assert_eq!(r.get_value().wait().unwrap(), 1);
    }

    // ---- Test 3: set ignores versions ----
    #[test]
    fn set_overwrites() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store, "k");
        let first = r.set(1).wait().unwrap();
        let second = r.set(2).wait().unwrap();
        assert!(second.dominates(&first));
        assert_eq!(r.get_value().wait().unwrap(), 2);
    }

    // ---- Test 4: delete and delete_version ----
    #[test]
    fn delete_reports_removal() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store, "k");
        assert!(!r.delete().wait().unwrap());

        let v1 = r.set(1).wait().unwrap();
        r.set(2).wait().unwrap();
        assert!(!r.delete_version(v1).wait().unwrap());
        assert!(r.delete().wait().unwrap());
        assert!(r.get().wait().unwrap_err().is_not_found());
    }

    // ---- Test 5: missing keys ----
    #[test]
    fn missing_key_defaults() {
        let store = Arc::new(Store::new());
        let r = resource(&store, "missing");
        assert!(r.get_value().wait().unwrap_err().is_not_found());
        assert_eq!(r.get_value_or(0).wait().unwrap(), 0);
        assert_eq!(Gettable::get_value_or(&r, 3).wait().unwrap(), 3);
    }

    // ---- Test 6: store failures pass through unchanged ----
    #[test]
    fn unavailable_store_passes_through() {
        let store = Arc::new(Store::new());
        let r = resource(&store, "k");
        let pending = r.set(1);
        store.set_available(false);
        let err = pending.wait().unwrap_err();
        assert!(matches!(
            err,
            crate::ResourceError::Store(kvres_store::StoreError::Unavailable(_))
        ));
    }

    // ---- Test 7: results are consumed on first use, not on construction ----
    #[test]
    fn construction_does_not_touch_store() {
        let store = Arc::new(Store::new());
        let r = resource(&store, "k");
        let pending = r.set(5);
        assert!(store.is_empty());
        pending.wait().unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn await_and_spawn_blocking() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store, "k");
        r.set(10).await.unwrap();
        assert_eq!(r.get_value().spawn_blocking().await.unwrap(), 10);
    }
}
