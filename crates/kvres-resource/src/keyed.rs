use std::fmt;
use std::sync::Arc;

use kvres_store::{StoreClient, StoreResult};
use kvres_types::VersionedValue;

/// A store client with one key bound in.
///
/// Every operation is the store's own keyed operation with the key already
/// supplied. Calls block, exactly as the underlying client does.
pub struct KeyedStore<S: StoreClient> {
    store: Arc<S>,
    key: S::Key,
}

impl<S: StoreClient> KeyedStore<S> {
    pub fn new(store: Arc<S>, key: S::Key) -> Self {
        Self { store, key }
    }

    pub fn key(&self) -> &S::Key {
        &self.key
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn get(&self) -> StoreResult<VersionedValue<S::Value, S::Version>> {
        self.store.get(&self.key)
    }

    pub fn get_with(
        &self,
        transforms: &S::Transforms,
    ) -> StoreResult<VersionedValue<S::Value, S::Version>> {
        self.store.get_with(&self.key, transforms)
    }

    pub fn get_or(
        &self,
        default: VersionedValue<S::Value, S::Version>,
    ) -> StoreResult<VersionedValue<S::Value, S::Version>> {
        self.store.get_or(&self.key, default)
    }

    pub fn get_value(&self) -> StoreResult<S::Value> {
        self.store.get_value(&self.key)
    }

    pub fn get_value_or(&self, default: S::Value) -> StoreResult<S::Value> {
        self.store.get_value_or(&self.key, default)
    }

    pub fn put(&self, value: S::Value) -> StoreResult<S::Version> {
        self.store.put(&self.key, value)
    }

    pub fn put_with(&self, value: S::Value, transforms: &S::Transforms) -> StoreResult<S::Version> {
        self.store.put_with(&self.key, value, transforms)
    }

    pub fn put_versioned(
        &self,
        versioned: VersionedValue<S::Value, S::Version>,
    ) -> StoreResult<S::Version> {
        self.store.put_versioned(&self.key, versioned)
    }

    pub fn put_if_not_obsolete(
        &self,
        versioned: VersionedValue<S::Value, S::Version>,
    ) -> StoreResult<bool> {
        self.store.put_if_not_obsolete(&self.key, versioned)
    }

    pub fn delete(&self) -> StoreResult<bool> {
        self.store.delete(&self.key)
    }

    pub fn delete_version(&self, version: &S::Version) -> StoreResult<bool> {
        self.store.delete_version(&self.key, version)
    }
}

impl<S: StoreClient> Clone for KeyedStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
        }
    }
}

impl<S: StoreClient> fmt::Debug for KeyedStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedStore").field("key", &self.key).finish()
    }
}
