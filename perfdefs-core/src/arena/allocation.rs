//! Allocation bookkeeping for the definition arena.

use crate::types::MovableOffset;

/// An entry describing a single allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEntry {
    /// Offset in the arena where the allocation starts.
    pub offset: MovableOffset,
    /// Size of the allocation in bytes, including alignment padding.
    pub size: u32,
}

impl AllocationEntry {
    /// Create a new allocation entry.
    #[must_use]
    pub const fn new(offset: MovableOffset, size: u32) -> Self {
        Self { offset, size }
    }

    /// Get the offset one past the end of this allocation.
    #[must_use]
    pub const fn end_offset(&self) -> MovableOffset {
        MovableOffset::new(self.offset.as_u32() + self.size)
    }
}

/// Running counters of an arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Allocations ever made, including rolled back ones.
    pub allocations: u64,
    /// Allocations released again by rollback.
    pub rollbacks: u64,
    /// Bytes currently in use.
    pub used_bytes: u64,
    /// Largest value `used_bytes` ever reached.
    pub peak_bytes: u64,
}

impl AllocationStats {
    pub(crate) fn record_allocation(&mut self, size: u32) {
        self.allocations += 1;
        self.used_bytes += u64::from(size);
        self.peak_bytes = self.peak_bytes.max(self.used_bytes);
    }

    pub(crate) fn record_rollback(&mut self, size: u32) {
        self.rollbacks += 1;
        self.used_bytes -= u64::from(size);
    }

    /// Number of allocations that are still live.
    #[must_use]
    pub const fn live_allocations(&self) -> u64 {
        self.allocations - self.rollbacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_entry_end() {
        let entry = AllocationEntry::new(MovableOffset::new(8), 24);
        assert_eq!(entry.end_offset(), MovableOffset::new(32));
    }

    #[test]
    fn stats_track_rollbacks() {
        let mut stats = AllocationStats::default();
        stats.record_allocation(16);
        stats.record_allocation(32);
        stats.record_rollback(32);

        assert_eq!(stats.allocations, 2);
        assert_eq!(stats.rollbacks, 1);
        assert_eq!(stats.live_allocations(), 1);
        assert_eq!(stats.used_bytes, 16);
        assert_eq!(stats.peak_bytes, 48);
    }
}
