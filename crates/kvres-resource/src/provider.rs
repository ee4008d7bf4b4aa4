use std::fmt;
use std::sync::Arc;

use kvres_store::StoreClient;
use kvres_types::VersionedValue;

use crate::capability::{
    DeletableResource, Deleter, ReadableResource, Reader, WritableResource, Writer,
};
use crate::resource::Resource;

/// Hands out read-only resources by key.
pub trait ReadableResourceProvider<K> {
    type Reader: ReadableResource;

    fn reader(&self, key: K) -> Self::Reader;
}

/// Hands out write-only resources by key.
pub trait WritableResourceProvider<K, W> {
    type Writer: WritableResource<W>;

    fn writer(&self, key: K) -> Self::Writer;
}

/// Hands out delete-only resources by key.
pub trait DeletableResourceProvider<K> {
    type Deleter: DeletableResource;

    fn deleter(&self, key: K) -> Self::Deleter;
}

/// Builds a [`Resource`] for any key of one store.
///
/// The provider only holds the shared store client. Every call builds a new
/// resource; nothing is cached, so asking twice for the same key gives two
/// independent resources over the same store entry.
pub struct ResourceProvider<S> {
    store: Arc<S>,
}

impl<S: StoreClient + 'static> ResourceProvider<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn get(&self, key: S::Key) -> Resource<S> {
        Resource::new(Arc::clone(&self.store), key)
    }

    pub fn reader(&self, key: S::Key) -> Reader<Resource<S>> {
        Reader::new(self.get(key))
    }

    pub fn writer(&self, key: S::Key) -> Writer<Resource<S>> {
        Writer::new(self.get(key))
    }

    pub fn deleter(&self, key: S::Key) -> Deleter<Resource<S>> {
        Deleter::new(self.get(key))
    }
}

impl<S> Clone for ResourceProvider<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> fmt::Debug for ResourceProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceProvider").finish_non_exhaustive()
    }
}

impl<S: StoreClient + 'static> ReadableResourceProvider<S::Key> for ResourceProvider<S> {
    type Reader = Reader<Resource<S>>;

    fn reader(&self, key: S::Key) -> Self::Reader {
        ResourceProvider::reader(self, key)
    }
}

impl<S: StoreClient + 'static>
    WritableResourceProvider<S::Key, VersionedValue<S::Value, S::Version>> for ResourceProvider<S>
{
    type Writer = Writer<Resource<S>>;

    fn writer(&self, key: S::Key) -> Self::Writer {
        ResourceProvider::writer(self, key)
    }
}

impl<S: StoreClient + 'static> DeletableResourceProvider<S::Key> for ResourceProvider<S> {
    type Deleter = Deleter<Resource<S>>;

    fn deleter(&self, key: S::Key) -> Self::Deleter {
        ResourceProvider::deleter(self, key)
    }
}

#[cfg(test)]
mod tests {
    use kvres_store::InMemoryStoreClient;
    use kvres_types::VectorClock;

    use super::*;

    type Store = InMemoryStoreClient<String, i64>;

    fn provider() -> ResourceProvider<Store> {
        ResourceProvider::new(Arc::new(Store::with_node_id(1)))
    }

    #[test]
    fn resources_are_fresh_but_share_the_store() {
        let p = provider();
        let a = p.get("k".to_string());
        let b = p.get("k".to_string());
        a.set(3).wait().unwrap();
        assert_eq!(b.get_value().wait().unwrap(), 3);
        assert!(Arc::ptr_eq(a.keyed().store(), p.store()));
    }

    #[test]
    fn narrowed_handles() {
        let p = provider();
        let version = p
            .writer("k".to_string())
            .write(VersionedValue::<i64, VectorClock>::unversioned(8))
            .wait()
            .unwrap();
        let read = p.reader("k".to_string()).get().wait().unwrap();
        assert_eq!(read, VersionedValue::new(8, version));
        assert!(p.deleter("k".to_string()).delete().wait().unwrap());
        assert!(p.store().is_empty());
    }

    fn read_via<P: ReadableResourceProvider<String>>(p: &P, key: &str) -> bool {
        p.reader(key.to_string()).get().wait().is_ok()
    }

    #[test]
    fn usable_through_provider_traits() {
        let p = provider();
        assert!(!read_via(&p, "k"));
        p.get("k".to_string()).set(1).wait().unwrap();
        assert!(read_via(&p, "k"));
    }
}
