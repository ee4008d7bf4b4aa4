//! Foundation types for kvres.
//!
//! Every other kvres crate depends on `kvres-types`. The types here are pure
//! data: they carry no store handle and perform no I/O.
//!
//! # Key Types
//!
//! - [`Version`] -- Opaque version token with a causal comparison
//! - [`Occurred`] -- Outcome of comparing two versions
//! - [`VectorClock`] -- Per-node counter clock used by the in-memory store
//! - [`VersionedValue`] -- A value paired with the version it was read or written at

pub mod clock;
pub mod error;
pub mod version;
pub mod versioned;

pub use clock::{NodeId, VectorClock};
pub use error::VersionError;
pub use version::{Occurred, Version};
pub use versioned::VersionedValue;
