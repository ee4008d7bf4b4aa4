//! Per-key resources over kvres store clients.
//!
//! A [`ResourceProvider`] turns a shared [`StoreClient`](kvres_store::StoreClient)
//! into one [`Resource`] per key. Each resource operation returns a
//! [`Deferred`]: a cold, single-value result that performs its blocking store
//! call only when it is awaited, waited on, spawned or streamed.
//!
//! # Capabilities
//!
//! Consumers can depend on just the capability they use:
//!
//! - [`ReadableResource`] -- `get`, value plus version
//! - [`WritableResource`] -- `write`, conditional on the supplied version
//! - [`DeletableResource`] / [`ConditionalDeletable`] -- `delete`
//! - [`Gettable`] / [`Settable`] -- bare values, no versions
//!
//! # Optimistic Concurrency
//!
//! [`ResourceMerger`] runs read-modify-write rounds against a resource.
//! The store's conditional write is the only concurrency control; a lost
//! race is retried only as far as the [`MergePolicy`] allows, and is then
//! reported as [`ResourceError::Conflict`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use kvres_resource::ResourceProvider;
//! use kvres_store::InMemoryStoreClient;
//!
//! let provider = ResourceProvider::new(Arc::new(InMemoryStoreClient::<String, u32>::new()));
//! let hits = provider.get("hits".to_string());
//!
//! let counter = hits.merger().update(|n| n.map_or(1, |n| n + 1));
//! assert_eq!(*counter.wait().unwrap().value(), 1);
//! assert_eq!(hits.get_value_or(0).wait().unwrap(), 1);
//! ```

pub mod capability;
pub mod deferred;
pub mod error;
pub mod keyed;
pub mod merger;
pub mod provider;
pub mod resource;

pub use capability::{
    ConditionalDeletable, DeletableResource, Deleter, Gettable, ReadableResource, Reader,
    Settable, WritableResource, Writer,
};
pub use deferred::Deferred;
pub use error::{ResourceError, ResourceResult};
pub use keyed::KeyedStore;
pub use merger::{Merge, MergeOutcome, MergePolicy, ResourceMerger};
pub use provider::{
    DeletableResourceProvider, ReadableResourceProvider, ResourceProvider,
    WritableResourceProvider,
};
pub use resource::Resource;
