use std::fmt;

use serde::{Deserialize, Serialize};

/// Causal relationship between two versions of the same key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurred {
    /// The left-hand version happened strictly before the right-hand one.
    Before,
    /// The left-hand version happened strictly after the right-hand one.
    After,
    /// Both versions describe the same point in the key's history.
    Equal,
    /// Neither version descends from the other.
    Concurrently,
}

impl Occurred {
    /// The relationship seen from the other side of the comparison.
    pub fn reversed(self) -> Self {
        match self {
            Occurred::Before => Occurred::After,
            Occurred::After => Occurred::Before,
            other => other,
        }
    }
}

impl fmt::Display for Occurred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Occurred::Before => "before",
            Occurred::After => "after",
            Occurred::Equal => "equal",
            Occurred::Concurrently => "concurrently",
        };
        f.write_str(s)
    }
}

/// An opaque token identifying a point in a key's write history.
///
/// What a version actually is (vector clock, sequence number, timestamp) is
/// the store's business. This layer only needs to compare two versions to
/// decide whether a write is stale.
///
/// `Default` must produce the "no history" version: the version a caller
/// attaches to a value it has never read.
pub trait Version: Clone + fmt::Debug + Default + Eq + Send + Sync + 'static {
    /// Compare `self` against `other`.
    fn compare(&self, other: &Self) -> Occurred;

    /// Returns `true` if `self` strictly descends from `other`.
    fn dominates(&self, other: &Self) -> bool {
        self.compare(other) == Occurred::After
    }

    /// Returns `true` if a write stamped with `self` must be rejected because
    /// the store already holds `current`.
    ///
    /// This is the one staleness predicate shared by every conditional write,
    /// whichever way the caller wants staleness signalled.
    fn is_obsoleted_by(&self, current: &Self) -> bool {
        !self.dominates(current)
    }
}
