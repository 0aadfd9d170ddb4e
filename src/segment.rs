use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle identifying one immutable on-disk index segment.
///
/// The coordinator never inspects the handle; it only routes it to the
/// sub-caches that hold segment-scoped entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Create a segment handle from its raw identifier
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identifier
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment-{}", self.0)
    }
}
