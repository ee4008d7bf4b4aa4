//! Keyed, versioned store clients for kvres.
//!
//! This crate defines the blocking contract that the resource layer adapts:
//! single-key get, unconditional put, conditional put and (optionally
//! versioned) delete. It does not speak any network protocol. Real clients
//! wrap their own transport and implement [`StoreClient`].
//!
//! # Storage Backends
//!
//! - [`InMemoryStoreClient`] -- `HashMap`-based store stamped with vector
//!   clocks, for tests and embedding
//!
//! # Design Rules
//!
//! 1. A conditional write is rejected with [`StoreError::ObsoleteVersion`]
//!    when the stored version has moved past the caller's.
//! 2. [`StoreClient::put_if_not_obsolete`] is derived from the conditional
//!    write, so both signaling styles agree on what is stale.
//! 3. Transport failures are reported as [`StoreError::Unavailable`] and never
//!    retried here.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStoreClient, ValueTransform};
pub use traits::StoreClient;
