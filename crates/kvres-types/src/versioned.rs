use serde::{Deserialize, Serialize};

use crate::clock::VectorClock;
use crate::version::Version;

/// A value as it was known at a particular version.
///
/// Immutable once built: there are no setters. Deriving a new value at the
/// same version goes through [`VersionedValue::map`], and writing a changed
/// value back is the store's job, which hands out the next version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionedValue<T, V = VectorClock> {
    value: T,
    version: V,
}

impl<T, V> VersionedValue<T, V> {
    /// Pair `value` with `version`.
    pub fn new(value: T, version: V) -> Self {
        Self { value, version }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> &V {
        &self.version
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, V) {
        (self.value, self.version)
    }

    /// Transform the value, keeping the version it was read at.
    pub fn map<U, F>(self, f: F) -> VersionedValue<U, V>
    where
        F: FnOnce(T) -> U,
    {
        VersionedValue {
            value: f(self.value),
            version: self.version,
        }
    }
}

impl<T, V: Version> VersionedValue<T, V> {
    /// Pair `value` with the "no history" version.
    ///
    /// A conditional write of an unversioned value only succeeds when the key
    /// does not exist yet.
    pub fn unversioned(value: T) -> Self {
        Self {
            value,
            version: V::default(),
        }
    }
}
