//! Wall-clock time values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical (wall-clock) time in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Create from a millisecond timestamp
    pub fn from_millis(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Time `secs` seconds after this one, saturating on overflow
    pub fn plus_secs(self, secs: u64) -> Self {
        Self {
            ts_ms: self.ts_ms.saturating_add(secs.saturating_mul(1000)),
        }
    }

    /// Milliseconds from `self` until `later`, zero if `later` is not after `self`
    pub fn millis_until(self, later: PhysicalTime) -> u64 {
        later.ts_ms.saturating_sub(self.ts_ms)
    }
}

impl fmt::Display for PhysicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.ts_ms)
    }
}
