//! Optimistic read-modify-write over a single resource.
//!
//! A merge round reads the current value, hands it to a caller-supplied
//! function and writes the result back conditioned on the version it read.
//! No lock is held between the read and the write; the store's version check
//! is the only concurrency control. When another writer got there first the
//! round is stale: the merger either reports [`ResourceError::Conflict`]
//! straight away or starts a fresh round, up to
//! [`MergePolicy::max_attempts`] rounds in total.

use kvres_types::{Version, VersionedValue};
use tracing::{debug, warn};

use crate::capability::{ConditionalDeletable, ReadableResource, WritableResource};
use crate::deferred::Deferred;
use crate::error::{ResourceError, ResourceResult};

/// How many rounds a merge may take before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MergePolicy {
    max_attempts: u32,
}

impl MergePolicy {
    /// A single round: the first conflict is reported to the caller.
    pub const fn report_conflicts() -> Self {
        Self { max_attempts: 1 }
    }

    /// Up to `max_attempts` rounds. Zero is treated as one.
    pub fn retrying(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::report_conflicts()
    }
}

/// What a merge function wants done with the current value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Merge<T> {
    Write(T),
    Delete,
    /// Leave the key as it is.
    Keep,
}

/// The result of a successful [`ResourceMerger::update_or_delete`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome<T, V> {
    /// The new value and the version the store gave it.
    Written(VersionedValue<T, V>),
    /// `false` if the key was already absent.
    Deleted(bool),
    /// The value the merge function saw, if any.
    Kept(Option<VersionedValue<T, V>>),
}

/// Read-modify-write on top of a resource's read, write and conditional
/// delete capabilities.
#[derive(Clone, Debug)]
pub struct ResourceMerger<R> {
    resource: R,
    policy: MergePolicy,
}

impl<R> ResourceMerger<R> {
    pub fn new(resource: R, policy: MergePolicy) -> Self {
        Self { resource, policy }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }
}

impl<R, T, V> ResourceMerger<R>
where
    R: ReadableResource<Value = T, Version = V>
        + WritableResource<VersionedValue<T, V>, Output = V>
        + ConditionalDeletable<V>
        + Clone
        + Send
        + 'static,
    T: Clone + Send + 'static,
    V: Version,
{
    /// Replace the value with `f(current)`.
    ///
    /// `f` sees `None` when the key does not exist. The new value is then
    /// written conditionally against the empty version, not as a blind
    /// overwrite: if another writer creates the key between the read and
    /// the write, the round is stale. The default policy reports that as a
    /// conflict; a retrying policy reads again and hands `f` the value the
    /// other writer created.
    ///
    /// `f` may run more than once when the policy allows retries.
    pub fn update<F>(&self, f: F) -> Deferred<VersionedValue<T, V>>
    where
        F: Fn(Option<&T>) -> T + Send + 'static,
    {
        let resource = self.resource.clone();
        let policy = self.policy;
        Deferred::new(move || {
            run_rounds(policy, || {
                let current = read_current(&resource)?;
                let value = f(current.as_ref().map(VersionedValue::value));
                write_round(&resource, current, value)
            })
        })
    }

    /// Write, delete or keep the value depending on `f(current)`.
    ///
    /// A delete is conditioned on the version just read. Asking to delete a
    /// key that does not exist succeeds with `Deleted(false)` without
    /// touching the store again.
    pub fn update_or_delete<F>(&self, f: F) -> Deferred<MergeOutcome<T, V>>
    where
        F: Fn(Option<&T>) -> Merge<T> + Send + 'static,
    {
        let resource = self.resource.clone();
        let policy = self.policy;
        Deferred::new(move || {
            run_rounds(policy, || {
                let current = read_current(&resource)?;
                match f(current.as_ref().map(VersionedValue::value)) {
                    Merge::Keep => Ok(Some(MergeOutcome::Kept(current))),
                    Merge::Write(value) => Ok(write_round(&resource, current, value)?
                        .map(MergeOutcome::Written)),
                    Merge::Delete => match current {
                        None => Ok(Some(MergeOutcome::Deleted(false))),
                        Some(read) => {
                            let (_, version) = read.into_parts();
                            if resource.delete_version(version).wait()? {
                                Ok(Some(MergeOutcome::Deleted(true)))
                            } else {
                                Ok(None)
                            }
                        }
                    },
                }
            })
        })
    }
}

/// Run `round` until it produces a value, fails, or the policy runs out.
/// `Ok(None)` from a round means it was stale.
fn run_rounds<X, F>(policy: MergePolicy, mut round: F) -> ResourceResult<X>
where
    F: FnMut() -> ResourceResult<Option<X>>,
{
    for attempt in 1..=policy.max_attempts() {
        if let Some(done) = round()? {
            return Ok(done);
        }
        debug!(attempt, max_attempts = policy.max_attempts(), "merge round was stale");
    }
    warn!(attempts = policy.max_attempts(), "merge gave up on conflicting writers");
    Err(ResourceError::Conflict {
        attempts: policy.max_attempts(),
    })
}

fn read_current<R>(resource: &R) -> ResourceResult<Option<VersionedValue<R::Value, R::Version>>>
where
    R: ReadableResource,
{
    match resource.get().wait() {
        Ok(read) => Ok(Some(read)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_round<R, T, V>(
    resource: &R,
    current: Option<VersionedValue<T, V>>,
    value: T,
) -> ResourceResult<Option<VersionedValue<T, V>>>
where
    R: WritableResource<VersionedValue<T, V>, Output = V>,
    T: Clone,
    V: Version,
{
    let versioned = match current {
        Some(read) => VersionedValue::new(value.clone(), read.into_parts().1),
        None => VersionedValue::unversioned(value.clone()),
    };
    match resource.write(versioned).wait() {
        Ok(version) => Ok(Some(VersionedValue::new(value, version))),
        Err(e) if e.is_obsolete() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use kvres_store::{InMemoryStoreClient, StoreClient};
    use kvres_types::VectorClock;

    use super::*;
    use crate::resource::Resource;

    type Store = InMemoryStoreClient<String, i64>;

    fn resource(store: &Arc<Store>) -> Resource<Store> {
        Resource::new(Arc::clone(store), "counter".to_string())
    }

    // ---- Test 1: policy coercion ----
    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(MergePolicy::retrying(0).max_attempts(), 1);
        assert_eq!(MergePolicy::default(), MergePolicy::report_conflicts());
        assert_eq!(MergePolicy::retrying(4).max_attempts(), 4);
    }

    // ---- Test 2: update creates then increments ----
    #[test]
    fn update_creates_and_increments() {
        let store = Arc::new(Store::with_node_id(1));
        let merger = resource(&store).merger();

        let first = merger.update(|v| v.map_or(1, |v| v + 1)).wait().unwrap();
        assert_eq!(*first.value(), 1);
        let second = merger.update(|v| v.map_or(1, |v| v + 1)).wait().unwrap();
        assert_eq!(*second.value(), 2);
        assert!(second.version().dominates(first.version()));
        assert_eq!(store.get_value(&"counter".to_string()).unwrap(), 2);
    }

    // ---- Test 3: a racing writer causes a conflict under the default policy ----
    #[test]
    fn conflict_reported_without_retry() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        r.set(10).wait().unwrap();

        let racer = Arc::clone(&store);
        let merger = r.merger();
        let err = merger
            .update(move |v| {
                // Another writer lands between our read and our write.
                racer.put(&"counter".to_string(), 99).unwrap();
                v.copied().unwrap_or(0) + 1
            })
            .wait()
            .unwrap_err();
        assert_eq!(err, ResourceError::Conflict { attempts: 1 });
        assert_eq!(r.get_value().wait().unwrap(), 99);
    }

    // ---- Test 4: retries re-read and succeed ----
    #[test]
    fn retry_rereads_after_conflict() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        r.set(10).wait().unwrap();

        let racer = Arc::clone(&store);
        let rounds = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&rounds);
        let merged = r
            .merger_with(MergePolicy::retrying(3))
            .update(move |v| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    racer.put(&"counter".to_string(), 20).unwrap();
                }
                v.copied().unwrap_or(0) + 1
            })
            .wait()
            .unwrap();
        assert_eq!(*merged.value(), 21);
        assert_eq!(rounds.load(Ordering::SeqCst), 2);
    }

    // ---- Test 5: exhausting retries ----
    #[test]
    fn retries_are_bounded() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        r.set(0).wait().unwrap();

        let racer = Arc::clone(&store);
        let rounds = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&rounds);
        let err = r
            .merger_with(MergePolicy::retrying(3))
            .update(move |v| {
                seen.fetch_add(1, Ordering::SeqCst);
                racer.put(&"counter".to_string(), -1).unwrap();
                v.copied().unwrap_or(0) + 1
            })
            .wait()
            .unwrap_err();
        assert_eq!(err, ResourceError::Conflict { attempts: 3 });
        assert_eq!(rounds.load(Ordering::SeqCst), 3);
    }

    // ---- Test 6: update_or_delete variants ----
    #[test]
    fn delete_when_condition_met() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        r.set(0).wait().unwrap();

        let outcome = r
            .merger()
            .update_or_delete(|v| match v {
                Some(0) => Merge::Delete,
                Some(n) => Merge::Write(n - 1),
                None => Merge::Keep,
            })
            .wait()
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Deleted(true));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_of_missing_key_is_false() {
        let store = Arc::new(Store::new());
        let outcome = resource(&store)
            .merger()
            .update_or_delete(|_| Merge::Delete)
            .wait()
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Deleted(false));
    }

    #[test]
    fn keep_returns_what_was_seen() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        let version = r.set(5).wait().unwrap();
        let outcome = r
            .merger()
            .update_or_delete(|_| Merge::Keep)
            .wait()
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Kept(Some(VersionedValue::new(5, version))));
    }

    #[test]
    fn stale_delete_is_a_conflict() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        r.set(1).wait().unwrap();

        let racer = Arc::clone(&store);
        let err = r
            .merger()
            .update_or_delete(move |_| {
                racer.put(&"counter".to_string(), 2).unwrap();
                Merge::<i64>::Delete
            })
            .wait()
            .unwrap_err();
        assert_eq!(err, ResourceError::Conflict { attempts: 1 });
        assert_eq!(r.get_value().wait().unwrap(), 2);
    }

    // ---- Test 7: store failures are not retried ----
    #[test]
    fn unavailable_store_fails_fast() {
        let store = Arc::new(Store::new());
        store.set_available(false);
        let rounds = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&rounds);
        let err = resource(&store)
            .merger_with(MergePolicy::retrying(5))
            .update(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                0
            })
            .wait()
            .unwrap_err();
        assert!(matches!(err, ResourceError::Store(_)));
        assert_eq!(rounds.load(Ordering::SeqCst), 0);
    }

    // ---- Test 8: concurrent creators, one wins the first version ----
    #[test]
    fn concurrent_creation_conflicts() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        let racer = Arc::clone(&store);
        let err = r
            .merger()
            .update(move |current| {
                assert!(current.is_none());
                racer
                    .put_versioned(&"counter".to_string(), VersionedValue::new(7, VectorClock::new()))
                    .unwrap();
                1
            })
            .wait()
            .unwrap_err();
        assert_eq!(err, ResourceError::Conflict { attempts: 1 });
        assert_eq!(r.get_value().wait().unwrap(), 7);
    }

    #[test]
    fn retry_after_concurrent_creation_sees_created_value() {
        let store = Arc::new(Store::with_node_id(1));
        let r = resource(&store);
        let racer = Arc::clone(&store);
        let rounds = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&rounds);
        let merged = r
            .merger_with(MergePolicy::retrying(2))
            .update(move |current| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    racer
                        .put_versioned(&"counter".to_string(), VersionedValue::new(7, VectorClock::new()))
                        .unwrap();
                }
                current.copied().unwrap_or(0) + 1
            })
            .wait()
            .unwrap();
        assert_eq!(rounds.load(Ordering::SeqCst), 2);
        assert_eq!(*merged.value(), 8);
        assert_eq!(r.get_value().wait().unwrap(), 8);
    }
}
