//! End-to-end behaviour of providers, resources and mergers over a store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use futures::StreamExt;
use kvres_resource::{
    DeletableResource, MergePolicy, ReadableResource, ResourceError, ResourceProvider,
    WritableResource,
};
use kvres_store::{InMemoryStoreClient, StoreClient, StoreError, StoreResult};
use kvres_types::{VectorClock, VersionedValue};

type Store = InMemoryStoreClient<String, i64>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn provider() -> ResourceProvider<Store> {
    init_tracing();
    ResourceProvider::new(Arc::new(Store::with_node_id(1)))
}

fn key(s: &str) -> String {
    s.to_string()
}

/// A store that counts calls and panics on every one of them.
#[derive(Default)]
struct ExplodingStore {
    calls: AtomicUsize,
}

impl ExplodingStore {
    fn boom(&self) -> ! {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("store must not be called");
    }
}

impl StoreClient for ExplodingStore {
    type Key = String;
    type Value = i64;
    type Version = VectorClock;
    type Transforms = ();

    fn find(&self, _: &String) -> StoreResult<Option<VersionedValue<i64>>> {
        self.boom()
    }

    fn find_with(&self, _: &String, _: &()) -> StoreResult<Option<VersionedValue<i64>>> {
        self.boom()
    }

    fn put(&self, _: &String, _: i64) -> StoreResult<VectorClock> {
        self.boom()
    }

    fn put_with(&self, _: &String, _: i64, _: &()) -> StoreResult<VectorClock> {
        self.boom()
    }

    fn put_versioned(&self, _: &String, _: VersionedValue<i64>) -> StoreResult<VectorClock> {
        self.boom()
    }

    fn delete(&self, _: &String) -> StoreResult<bool> {
        self.boom()
    }

    fn delete_version(&self, _: &String, _: &VectorClock) -> StoreResult<bool> {
        self.boom()
    }
}

// ---- Scenario 1: write, read back, stale writer loses ----
#[test]
fn write_read_then_stale_write_fails() {
    let p = provider();
    let v0 = VectorClock::new();

    let v1 = p
        .get(key("k"))
        .write(VersionedValue::new(42, v0.clone()))
        .wait()
        .unwrap();
    let read = p.get(key("k")).get().wait().unwrap();
    assert_eq!(read, VersionedValue::new(42, v1));

    let err = p
        .get(key("k"))
        .write(VersionedValue::new(7, v0))
        .wait()
        .unwrap_err();
    assert!(err.is_obsolete(), "expected obsolete version, got {err}");
    assert_eq!(p.get(key("k")).get_value().wait().unwrap(), 42);
}

// ---- Scenario 2: missing key with and without a default ----
#[test]
fn missing_key_not_found_or_default() {
    let p = provider();
    let err = p.get(key("missing")).get().wait().unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, ResourceError::Store(StoreError::NotFound { .. })));
    assert_eq!(p.get(key("missing")).get_value_or(0).wait().unwrap(), 0);
}

// ---- Scenario 3: deleting a missing key is not an error ----
#[test]
fn delete_missing_returns_false() {
    let p = provider();
    assert!(!p.get(key("nothing")).delete().wait().unwrap());
    assert!(!p.deleter(key("nothing")).delete().wait().unwrap());
}

// ---- Scenario 4: results are cold ----
#[test]
fn building_results_never_calls_the_store() {
    init_tracing();
    let store = Arc::new(ExplodingStore::default());
    let p = ResourceProvider::new(Arc::clone(&store));
    let r = p.get(key("k"));

    let get = r.get();
    let write = r.write(VersionedValue::unversioned(1));
    let delete = r.delete();
    let merge = r.merger().update(|_| 0);
    let unread = p.reader(key("k")).get();
    let unwritten = p
        .writer(key("k"))
        .write(VersionedValue::<i64, VectorClock>::unversioned(2));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);

    assert!(matches!(get.wait(), Err(ResourceError::Panicked(_))));
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(write.wait(), Err(ResourceError::Panicked(_))));
    assert!(matches!(delete.wait(), Err(ResourceError::Panicked(_))));
    assert!(matches!(merge.wait(), Err(ResourceError::Panicked(_))));
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    drop((unread, unwritten));
    assert_eq!(store.calls.load(Ordering::SeqCst), 4);
}

// ---- Scenario 5: the two conditional write shapes agree ----
#[test]
fn throwing_and_boolean_writes_agree() {
    let p = provider();
    let r = p.get(key("k"));
    let base = r.set(1).wait().unwrap();
    r.set(2).wait().unwrap();

    let stale = VersionedValue::new(3, base);
    let thrown = r.write(stale.clone()).wait();
    let flagged = r.write_if_not_obsolete(stale).wait();
    assert!(thrown.unwrap_err().is_obsolete());
    assert_eq!(flagged, Ok(false));

    let fresh = r.get().wait().unwrap().map(|v| v + 1);
    assert_eq!(r.write_if_not_obsolete(fresh).wait(), Ok(true));
    assert_eq!(r.get_value().wait().unwrap(), 3);
}

// ---- Scenario 6: concurrent writers from the same version, one wins ----
#[test]
fn one_of_many_concurrent_writers_wins() {
    let p = provider();
    let r = p.get(key("race"));
    let start = r.set(0).wait().unwrap();

    let writers = 8;
    let barrier = Arc::new(Barrier::new(writers));
    let handles: Vec<_> = (0..writers)
        .map(|i| {
            let r = r.clone();
            let barrier = Arc::clone(&barrier);
            let versioned = VersionedValue::new(i as i64 + 1, start.clone());
            thread::spawn(move || {
                let pending = r.write(versioned);
                barrier.wait();
                pending.wait()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(ResourceError::is_obsolete));
}

// ---- Scenario 7: retrying mergers converge under contention ----
#[test]
fn retrying_mergers_lose_no_updates() {
    let p = provider();
    let threads = 4;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let merger = p
                .get(key("counter"))
                .merger_with(MergePolicy::retrying(10_000));
            thread::spawn(move || {
                for _ in 0..per_thread {
                    merger.update(|n| n.copied().unwrap_or(0) + 1).wait().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let total = p.get(key("counter")).get_value().wait().unwrap();
    assert_eq!(total, (threads * per_thread) as i64);
}

// ---- Scenario 8: async consumers ----
#[tokio::test]
async fn async_consumption_styles() {
    let p = provider();
    let r = p.get(key("k"));

    let v1 = r.write(VersionedValue::unversioned(5)).await.unwrap();
    let read = r.get().spawn_blocking().await.unwrap();
    assert_eq!(read.version(), &v1);

    let mut stream = r.delete().into_stream();
    assert_eq!(stream.next().await, Some(Ok(true)));
    assert_eq!(stream.next().await, None);
}

// ---- Scenario 9: transport failures pass through unchanged ----
#[tokio::test]
async fn unavailable_store_surfaces_through_every_channel() {
    init_tracing();
    let store = Arc::new(Store::new());
    let p = ResourceProvider::new(Arc::clone(&store));
    store.set_available(false);

    let expected = |e: &ResourceError| matches!(e, ResourceError::Store(StoreError::Unavailable(_)));
    assert!(expected(&p.get(key("k")).get().await.unwrap_err()));
    assert!(expected(&p.get(key("k")).set(1).spawn_blocking().await.unwrap_err()));
    let item = p.get(key("k")).delete().into_stream().next().await;
    assert!(matches!(item, Some(Err(ref e)) if expected(e)));
}
