//! Cache statistics

use serde::{Deserialize, Serialize};

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of committed (fully downloaded, size-verified) entries
    pub committed_entries: usize,

    /// Bytes held by committed entries
    pub committed_bytes: u64,

    /// Allocations still owned by an in-flight download
    pub provisional_entries: usize,
}

impl CacheStats {
    /// Returns average bytes per committed entry.
    pub fn average_entry_size(&self) -> u64 {
        if self.committed_entries == 0 {
            0
        } else {
            self.committed_bytes / self.committed_entries as u64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.committed_entries == 0 && self.provisional_entries == 0
    }
}
