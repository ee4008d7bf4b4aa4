use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::VersionError;
use crate::version::{Occurred, Version};

/// Identifier of the node that stamped a clock entry.
pub type NodeId = u16;

/// Vector clock version token.
///
/// Each entry counts the writes a node has applied to the key. Two clocks are
/// ordered when one has every counter greater than or equal to the other's;
/// otherwise they are concurrent.
///
/// The wall-clock `timestamp_ms` records when the clock was last incremented.
/// It is informational only and does not take part in equality, hashing or
/// comparison.
///
/// Deserialization goes through [`VectorClock::with_entries`], so zero
/// counters in the input are dropped.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "ClockRepr")]
pub struct VectorClock {
    entries: BTreeMap<NodeId, u64>,
    timestamp_ms: u64,
}

#[derive(Deserialize)]
struct ClockRepr {
    entries: BTreeMap<NodeId, u64>,
    #[serde(default)]
    timestamp_ms: u64,
}

impl From<ClockRepr> for VectorClock {
    fn from(repr: ClockRepr) -> Self {
        Self::with_entries(repr.entries, repr.timestamp_ms)
    }
}

impl VectorClock {
    /// The empty clock: no node has written yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clock from explicit `(node, counter)` pairs.
    ///
    /// Zero counters are dropped so that `{n1:0}` and `{}` are the same clock.
    pub fn with_entries<I>(entries: I, timestamp_ms: u64) -> Self
    where
        I: IntoIterator<Item = (NodeId, u64)>,
    {
        Self {
            entries: entries.into_iter().filter(|(_, c)| *c > 0).collect(),
            timestamp_ms,
        }
    }

    /// Counter recorded for `node`, zero if absent.
    pub fn counter(&self, node: NodeId) -> u64 {
        self.entries.get(&node).copied().unwrap_or(0)
    }

    /// Wall-clock milliseconds of the last increment.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// Iterate over `(node, counter)` pairs in node order.
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.entries.iter().map(|(n, c)| (*n, *c))
    }

    /// Returns `true` if no node has written.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record one more write by `node`.
    pub fn increment(&mut self, node: NodeId, timestamp_ms: u64) -> Result<(), VersionError> {
        let counter = self.entries.entry(node).or_insert(0);
        *counter = counter
            .checked_add(1)
            .ok_or(VersionError::CounterOverflow { node })?;
        self.timestamp_ms = timestamp_ms;
        Ok(())
    }

    /// A copy of this clock with one more write by `node`.
    pub fn incremented(&self, node: NodeId, timestamp_ms: u64) -> Result<Self, VersionError> {
        let mut next = self.clone();
        next.increment(node, timestamp_ms)?;
        Ok(next)
    }

    /// Pointwise maximum of both clocks. The result descends from both.
    pub fn merge(&self, other: &Self) -> Self {
        let mut entries = self.entries.clone();
        for (node, counter) in &other.entries {
            let slot = entries.entry(*node).or_insert(0);
            *slot = (*slot).max(*counter);
        }
        Self {
            entries,
            timestamp_ms: self.timestamp_ms.max(other.timestamp_ms),
        }
    }

    /// Current wall-clock time in milliseconds since the UNIX epoch.
    pub fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Version for VectorClock {
    fn compare(&self, other: &Self) -> Occurred {
        let mut self_bigger = false;
        let mut other_bigger = false;

        for node in self.entries.keys().chain(other.entries.keys()) {
            let mine = self.counter(*node);
            let theirs = other.counter(*node);
            if mine > theirs {
                self_bigger = true;
            } else if theirs > mine {
                other_bigger = true;
            }
            if self_bigger && other_bigger {
                return Occurred::Concurrently;
            }
        }

        match (self_bigger, other_bigger) {
            (true, false) => Occurred::After,
            (false, true) => Occurred::Before,
            (false, false) => Occurred::Equal,
            (true, true) => Occurred::Concurrently,
        }
    }
}

impl PartialEq for VectorClock {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for VectorClock {}

impl Hash for VectorClock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl fmt::Debug for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorClock({self} @{}ms)", self.timestamp_ms)
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("v{")?;
        for (i, (node, counter)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}:{counter}")?;
        }
        f.write_str("}")
    }
}
