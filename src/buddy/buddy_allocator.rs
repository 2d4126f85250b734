//! Size-class buddy allocator
//!
//! Tracks how many blocks of each power-of-two size are free or allocated in
//! a fixed arena. Blocks have no identity: two free blocks of the same size
//! are treated as buddies whenever both exist.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{AllocError, AllocResult, KbAllocator, DEFAULT_ARENA_KB};

#[cfg(feature = "log")]
use log::{debug, info, warn};

#[cfg(feature = "tracking")]
use super::stats::{BuddyStats, MemoryStatsReporter};

use super::{
    size_class::{block_size_for, order_of, SizeClassCounts, DEFAULT_MAX_ORDER},
    trace::{memory_state_lines, Trace},
};

/// Buddy allocator over a single arena of `total_kb` kilobytes
///
/// Every `allocate`/`free` call opens a new numbered step and rewrites the
/// trace, which callers read back through [`BuddyAllocator::trace`].
#[derive(Debug, Clone)]
pub struct BuddyAllocator {
    total_kb: usize,
    max_order: usize,
    free_blocks: SizeClassCounts,
    allocated_blocks: SizeClassCounts,
    trace: Trace,
}

impl BuddyAllocator {
    /// Create an allocator whose whole arena is one free block.
    ///
    /// The arena must be a power of two no larger than `2^DEFAULT_MAX_ORDER` KB.
    pub fn new(total_kb: usize) -> AllocResult<Self> {
        if !total_kb.is_power_of_two() || order_of(total_kb) > DEFAULT_MAX_ORDER {
            warn!(
                "buddy allocator: invalid arena size {} KB (max order {})",
                total_kb, DEFAULT_MAX_ORDER
            );
            return Err(AllocError::InvalidArenaSize);
        }

        Ok(Self::with_arena(total_kb))
    }

    /// Build the allocator for an arena already known to be valid.
    fn with_arena(total_kb: usize) -> Self {
        let max_order = order_of(total_kb);
        let mut free_blocks = SizeClassCounts::new();
        free_blocks.add(max_order, 1);

        info!(
            "buddy allocator: arena of {} KB (order {})",
            total_kb, max_order
        );

        Self {
            total_kb,
            max_order,
            free_blocks,
            allocated_blocks: SizeClassCounts::new(),
            trace: Trace::new(),
        }
    }

    /// Reserve the smallest power-of-two block holding `requested` KB.
    ///
    /// The tightest free size class is taken and split down to the target,
    /// leaving one free half at each level. Returns the reserved block size.
    pub fn allocate(&mut self, requested: usize) -> AllocResult<usize> {
        let block_size = self.checked_block_size(requested)?;
        let required_order = order_of(block_size);

        self.trace.begin_allocate(requested, block_size);

        // Smallest sufficient size class wins
        let found =
            (required_order..=self.max_order).find(|&order| self.free_blocks.get(order) > 0);

        let Some(order) = found else {
            self.trace.allocation_failed();
            debug!(
                "buddy allocator: Allocation failure: {} KB (block {} KB)",
                requested, block_size
            );
            self.print_alloc_failure_stats(requested, block_size);
            self.trace.finish_step();
            return Err(AllocError::AllocationFailed);
        };

        self.free_blocks.take(order, 1);
        self.allocated_blocks.add(required_order, 1);

        // Split down to required order, keeping one half free at each level.
        // The halving of the found block itself is not traced.
        let mut current = order;
        while current > required_order {
            current -= 1;
            self.free_blocks.add(current, 1);
            if current + 1 != order {
                self.trace.split(1 << (current + 1), 1 << current);
            }
        }

        self.trace.allocated(block_size);
        self.trace.finish_step();
        Ok(block_size)
    }

    /// Return one block of the size class `requested` rounds up to, then
    /// coalesce upward from that size.
    pub fn free(&mut self, requested: usize) -> AllocResult {
        let block_size = self.checked_block_size(requested)?;
        let order = order_of(block_size);

        self.trace.begin_free(requested, block_size);

        if !self.allocated_blocks.take(order, 1) {
            self.trace.untracked_free();
            warn!(
                "buddy allocator: free of {} KB: no allocated block of {} KB",
                requested, block_size
            );
            self.trace.finish_step();
            return Err(AllocError::FreeOfUntrackedSize);
        }

        self.free_blocks.add(order, 1);
        self.trace.freed(block_size);

        self.merge_buddies(order);

        self.trace
            .memory_state(&self.free_blocks, &self.allocated_blocks);
        self.trace.finish_step();
        Ok(())
    }

    /// Merge pairs of free blocks upward from `start_order`.
    ///
    /// Only the chain of doublings starting at `start_order` is examined; the
    /// first size with fewer than two free blocks ends the pass.
    fn merge_buddies(&mut self, start_order: usize) {
        let mut current = start_order;
        while current < self.max_order && self.free_blocks.get(current) >= 2 {
            self.free_blocks.take(current, 2);
            self.free_blocks.add(current + 1, 1);
            self.trace.merged(1 << current, 1 << (current + 1));
            current += 1;
        }
    }

    /// Round `requested` up, clearing the trace when the size is rejected.
    fn checked_block_size(&mut self, requested: usize) -> AllocResult<usize> {
        block_size_for(requested).map_err(|err| {
            self.trace.clear();
            warn!("buddy allocator: invalid request of {} KB", requested);
            err
        })
    }

    /// Arena size in KB.
    pub fn total_kb(&self) -> usize {
        self.total_kb
    }

    /// Order of the whole-arena block.
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// `(block_size, count)` for every free size class, smallest first.
    pub fn free_blocks(&self) -> impl DoubleEndedIterator<Item = (usize, usize)> + '_ {
        self.free_blocks.iter()
    }

    /// `(block_size, count)` for every allocated size class, smallest first.
    pub fn allocated_blocks(&self) -> impl DoubleEndedIterator<Item = (usize, usize)> + '_ {
        self.allocated_blocks.iter()
    }

    /// Free blocks of exactly `block_size` KB; zero for non-power-of-two sizes.
    pub fn free_count(&self, block_size: usize) -> usize {
        if block_size.is_power_of_two() {
            self.free_blocks.get(order_of(block_size))
        } else {
            0
        }
    }

    /// Outstanding allocations of exactly `block_size` KB; zero for non-power-of-two sizes.
    pub fn allocated_count(&self, block_size: usize) -> usize {
        if block_size.is_power_of_two() {
            self.allocated_blocks.get(order_of(block_size))
        } else {
            0
        }
    }

    /// Lines recorded by the most recent `allocate`/`free` call.
    pub fn trace(&self) -> &[String] {
        self.trace.lines()
    }

    /// Label the next operation will carry.
    pub fn step(&self) -> usize {
        self.trace.step()
    }

    /// Current free and allocated classes, as printed after every free.
    pub fn memory_state(&self) -> Vec<String> {
        memory_state_lines(&self.free_blocks, &self.allocated_blocks)
    }

    /// Print the block distribution of the arena
    #[allow(unused_variables)]
    pub fn print_state(&self) {
        info!("========== Buddy Allocator State ==========");
        info!("Arena: {} KB (order {})", self.total_kb, self.max_order);
        info!("Free: {} KB", self.free_blocks.total_kb());
        info!("Used: {} KB", self.allocated_blocks.total_kb());
        for (size, count) in self.free_blocks.iter().rev() {
            info!("  free: {} block(s) of {} KB", count, size);
        }
        for (size, count) in self.allocated_blocks.iter().rev() {
            info!("  allocated: {} block(s) of {} KB", count, size);
        }
        info!("===========================================");
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> BuddyStats {
        BuddyStats::collect(self.total_kb, &self.free_blocks, &self.allocated_blocks)
    }

    /// Print detailed allocation failure statistics
    #[cfg(feature = "tracking")]
    pub fn print_alloc_failure_stats(&self, request_kb: usize, block_kb: usize) {
        MemoryStatsReporter::print_alloc_failure_stats(&self.get_stats(), request_kb, block_kb);
    }

    #[cfg(not(feature = "tracking"))]
    pub fn print_alloc_failure_stats(&self, _request_kb: usize, _block_kb: usize) {
        // No-op when tracking is disabled
    }
}

impl Default for BuddyAllocator {
    fn default() -> Self {
        Self::with_arena(DEFAULT_ARENA_KB)
    }
}

impl KbAllocator for BuddyAllocator {
    fn allocate(&mut self, size: usize) -> AllocResult<usize> {
        BuddyAllocator::allocate(self, size)
    }

    fn free(&mut self, size: usize) -> AllocResult {
        BuddyAllocator::free(self, size)
    }

    fn total_kb(&self) -> usize {
        self.total_kb
    }

    fn used_kb(&self) -> usize {
        self.allocated_blocks.total_kb()
    }

    fn available_kb(&self) -> usize {
        self.free_blocks.total_kb()
    }
}
