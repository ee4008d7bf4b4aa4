//! Single-capability traits.
//!
//! A [`Resource`](crate::Resource) implements all of them. Code that only
//! reads should ask for a [`ReadableResource`], code that only deletes for a
//! [`DeletableResource`], and so on. The [`Reader`], [`Writer`] and
//! [`Deleter`] wrappers hide everything but one capability, for handing a
//! narrowed resource to code that must not do more.

use kvres_types::{Version, VersionedValue};

use crate::deferred::Deferred;

/// Reads the value and the version it was read at.
pub trait ReadableResource {
    type Value: Clone + Send + 'static;
    type Version: Version;

    /// Fails with "not found" if the key is absent.
    fn get(&self) -> Deferred<VersionedValue<Self::Value, Self::Version>>;
}

/// Writes `W` and yields whatever the store reports back, usually the new
/// version.
pub trait WritableResource<W> {
    type Output;

    fn write(&self, value: W) -> Deferred<Self::Output>;
}

/// Removes the key unconditionally.
pub trait DeletableResource {
    /// Yields `true` if a value was removed. A missing key is not an error.
    fn delete(&self) -> Deferred<bool>;
}

/// Removes the key only if nothing newer than `V` was written.
pub trait ConditionalDeletable<V> {
    fn delete_version(&self, version: V) -> Deferred<bool>;
}

/// Reads the bare value, without its version.
pub trait Gettable {
    type Value: Send + 'static;

    fn get_value(&self) -> Deferred<Self::Value>;

    /// Yields `default` instead of failing when the key is absent.
    fn get_value_or(&self, default: Self::Value) -> Deferred<Self::Value> {
        self.get_value().recover_not_found(default)
    }
}

/// Stores a bare value, ignoring whatever is there.
pub trait Settable<T> {
    type Output;

    fn set(&self, value: T) -> Deferred<Self::Output>;
}

/// Exposes only [`ReadableResource`].
#[derive(Clone, Debug)]
pub struct Reader<R>(R);

impl<R: ReadableResource> Reader<R> {
    pub fn new(resource: R) -> Self {
        Self(resource)
    }
}

impl<R: ReadableResource> ReadableResource for Reader<R> {
    type Value = R::Value;
    type Version = R::Version;

    fn get(&self) -> Deferred<VersionedValue<R::Value, R::Version>> {
        self.0.get()
    }
}

/// Exposes only [`WritableResource`].
#[derive(Clone, Debug)]
pub struct Writer<R>(R);

impl<R> Writer<R> {
    pub fn new(resource: R) -> Self {
        Self(resource)
    }
}

impl<R, W> WritableResource<W> for Writer<R>
where
    R: WritableResource<W>,
{
    type Output = R::Output;

    fn write(&self, value: W) -> Deferred<R::Output> {
        self.0.write(value)
    }
}

/// Exposes only [`DeletableResource`].
#[derive(Clone, Debug)]
pub struct Deleter<R>(R);

impl<R: DeletableResource> Deleter<R> {
    pub fn new(resource: R) -> Self {
        Self(resource)
    }
}

impl<R: DeletableResource> DeletableResource for Deleter<R> {
    fn delete(&self) -> Deferred<bool> {
        self.0.delete()
    }
}
