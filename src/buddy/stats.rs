//! Statistics and debugging for buddy allocator
//!
//! Provides detailed statistics tracking and failure reporting.

use super::size_class::{SizeClassCounts, DEFAULT_MAX_ORDER};

/// Buddy system statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    pub total_kb: usize,
    pub free_kb: usize,
    pub used_kb: usize,
    pub free_blocks_by_order: [usize; DEFAULT_MAX_ORDER + 1],
    pub allocated_blocks_by_order: [usize; DEFAULT_MAX_ORDER + 1],
}

impl Default for BuddyStats {
    fn default() -> Self {
        Self::new()
    }
}

impl BuddyStats {
    pub const fn new() -> Self {
        Self {
            total_kb: 0,
            free_kb: 0,
            used_kb: 0,
            free_blocks_by_order: [0; DEFAULT_MAX_ORDER + 1],
            allocated_blocks_by_order: [0; DEFAULT_MAX_ORDER + 1],
        }
    }

    /// Snapshot the counters of one arena.
    pub fn collect(total_kb: usize, free: &SizeClassCounts, allocated: &SizeClassCounts) -> Self {
        let mut stats = Self::new();
        stats.total_kb = total_kb;
        for order in 0..=DEFAULT_MAX_ORDER {
            stats.free_blocks_by_order[order] = free.get(order);
            stats.allocated_blocks_by_order[order] = allocated.get(order);
        }
        stats.free_kb = free.total_kb();
        stats.used_kb = allocated.total_kb();
        stats
    }

    /// Largest free block in KB, if any block is free.
    pub fn largest_free_kb(&self) -> Option<usize> {
        self.free_blocks_by_order
            .iter()
            .rposition(|&count| count > 0)
            .map(|order| 1 << order)
    }

    /// Whether every KB of the arena is accounted for exactly once.
    pub fn is_conserved(&self) -> bool {
        self.free_kb + self.used_kb == self.total_kb
    }
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(stats: &BuddyStats, request_kb: usize, block_kb: usize) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!("Request: {} KB (block of {} KB)", request_kb, block_kb);
        error!("Arena State:");
        error!("  Total: {} KB", stats.total_kb);
        error!("  Free: {} KB", stats.free_kb);
        error!("  Used: {} KB", stats.used_kb);
        if let Some(largest) = stats.largest_free_kb() {
            error!("  Largest free block: {} KB", largest);
        } else {
            error!("  Largest free block: none");
        }
        error!("  Free blocks by order:");
        for order in (0..=DEFAULT_MAX_ORDER).rev() {
            let count = stats.free_blocks_by_order[order];
            if count > 0 {
                let block_size = 1usize << order;
                error!(
                    "    Order {}: {} blocks ({} KB each, {} KB total)",
                    order,
                    count,
                    block_size,
                    count * block_size
                );
            }
        }
        error!("========================================");
    }
}
