//! The [`StoreClient`] trait defining the keyed store contract.
//!
//! Any backend (in-memory, remote key-value cluster, database) implements
//! this trait. Every call blocks the calling thread until the store answers.

use std::fmt::Debug;
use std::hash::Hash;

use kvres_types::{Version, VersionedValue};

use crate::error::{StoreError, StoreResult};

/// Blocking client for a keyed, versioned store.
///
/// Implementations must be thread-safe (`Send + Sync`): one client is shared
/// by every resource derived from it.
///
/// Only the primitive operations are required. The `get*` family and
/// [`put_if_not_obsolete`](StoreClient::put_if_not_obsolete) are derived, so
/// that "not found" and "stale" mean the same thing for every backend.
pub trait StoreClient: Send + Sync {
    type Key: Clone + Debug + Eq + Hash + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;
    type Version: Version;
    /// Store-defined transform applied on read or before write. Opaque here.
    type Transforms: Send + Sync;

    /// Read the current value and version.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn find(
        &self,
        key: &Self::Key,
    ) -> StoreResult<Option<VersionedValue<Self::Value, Self::Version>>>;

    /// Like [`find`](StoreClient::find), letting the store transform the
    /// value before returning it.
    fn find_with(
        &self,
        key: &Self::Key,
        transforms: &Self::Transforms,
    ) -> StoreResult<Option<VersionedValue<Self::Value, Self::Version>>>;

    /// Unconditional write. Returns the new version.
    fn put(&self, key: &Self::Key, value: Self::Value) -> StoreResult<Self::Version>;

    /// Unconditional write of a transformed value. Returns the new version.
    fn put_with(
        &self,
        key: &Self::Key,
        value: Self::Value,
        transforms: &Self::Transforms,
    ) -> StoreResult<Self::Version>;

    /// Conditional write.
    ///
    /// Fails with [`StoreError::ObsoleteVersion`] if the stored version is not
    /// dominated by the write, i.e. someone else wrote since `versioned` was
    /// read.
    fn put_versioned(
        &self,
        key: &Self::Key,
        versioned: VersionedValue<Self::Value, Self::Version>,
    ) -> StoreResult<Self::Version>;

    /// Delete the key. Returns `true` if a value was removed.
    fn delete(&self, key: &Self::Key) -> StoreResult<bool>;

    /// Delete the key only if the stored version is not newer than `version`.
    ///
    /// Returns `true` if a value was removed.
    fn delete_version(&self, key: &Self::Key, version: &Self::Version) -> StoreResult<bool>;

    /// Read the current value and version, failing with
    /// [`StoreError::NotFound`] if the key does not exist.
    fn get(&self, key: &Self::Key) -> StoreResult<VersionedValue<Self::Value, Self::Version>> {
        self.find(key)?.ok_or_else(|| not_found(key))
    }

    /// Transforming variant of [`get`](StoreClient::get).
    fn get_with(
        &self,
        key: &Self::Key,
        transforms: &Self::Transforms,
    ) -> StoreResult<VersionedValue<Self::Value, Self::Version>> {
        self.find_with(key, transforms)?
            .ok_or_else(|| not_found(key))
    }

    /// Read the current value and version, or `default` if absent.
    fn get_or(
        &self,
        key: &Self::Key,
        default: VersionedValue<Self::Value, Self::Version>,
    ) -> StoreResult<VersionedValue<Self::Value, Self::Version>> {
        Ok(self.find(key)?.unwrap_or(default))
    }

    /// Read the current value, failing with [`StoreError::NotFound`] if absent.
    fn get_value(&self, key: &Self::Key) -> StoreResult<Self::Value> {
        self.get(key).map(VersionedValue::into_value)
    }

    /// Read the current value, or `default` if absent.
    fn get_value_or(&self, key: &Self::Key, default: Self::Value) -> StoreResult<Self::Value> {
        Ok(self
            .find(key)?
            .map(VersionedValue::into_value)
            .unwrap_or(default))
    }

    /// Conditional write that reports staleness as `Ok(false)`.
    ///
    /// Goes through [`put_versioned`](StoreClient::put_versioned), so it
    /// treats exactly the same writes as stale.
    fn put_if_not_obsolete(
        &self,
        key: &Self::Key,
        versioned: VersionedValue<Self::Value, Self::Version>,
    ) -> StoreResult<bool> {
        match self.put_versioned(key, versioned) {
            Ok(_) => Ok(true),
            Err(StoreError::ObsoleteVersion { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn not_found<K: Debug>(key: &K) -> StoreError {
    StoreError::NotFound {
        key: format!("{key:?}"),
    }
}
