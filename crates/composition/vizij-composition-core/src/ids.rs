//! Identifiers for scene objects and the graphs that own them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Index of an object inside a [`SceneGraph`](crate::scene::SceneGraph) arena.
///
/// Two references holding the same id point at the same (shared) object.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u32);

impl ObjectId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique identity of one graph's storage. Never serialized.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GraphId(u64);

static NEXT_GRAPH: AtomicU64 = AtomicU64::new(1);

impl GraphId {
    /// Allocate a fresh identity. Ids are monotonic and never reused within a process.
    #[inline]
    pub fn next() -> Self {
        GraphId(NEXT_GRAPH.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for GraphId {
    fn default() -> Self {
        GraphId::next()
    }
}
