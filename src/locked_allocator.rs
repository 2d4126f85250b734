//! Shared buddy allocator.
//!
//! This module wraps a [`BuddyAllocator`] behind a spin lock so that one
//! instance can be used from several threads or from a `static`. Each
//! operation holds the lock for its whole duration and hands back its own
//! trace, so callers never observe the trace of somebody else's call.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::buddy::BuddyAllocator;
#[cfg(feature = "tracking")]
use crate::buddy::BuddyStats;
use crate::{AllocError, AllocResult};
use kspin::SpinNoIrq;

#[cfg(feature = "log")]
use log::error;

/// Result of one locked operation together with the trace it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traced<T> {
    pub result: AllocResult<T>,
    /// Step label the operation ran under; 0 if it never opened a step.
    pub step: usize,
    pub trace: Vec<String>,
}

impl<T> Traced<T> {
    fn rejected(err: AllocError) -> Self {
        Self {
            result: Err(err),
            step: 0,
            trace: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Buddy allocator guarded by a single spin lock
pub struct LockedBuddyAllocator {
    allocator: SpinNoIrq<Option<BuddyAllocator>>,
    initialized: AtomicBool,
}

impl LockedBuddyAllocator {
    /// An allocator with no arena yet; call [`init`](Self::init) before use.
    pub const fn new_uninit() -> Self {
        Self {
            allocator: SpinNoIrq::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Create a ready allocator over an arena of `total_kb`.
    pub fn new(total_kb: usize) -> AllocResult<Self> {
        let locked = Self::new_uninit();
        locked.init(total_kb)?;
        Ok(locked)
    }

    /// Initialize (or reset) the arena.
    pub fn init(&self, total_kb: usize) -> AllocResult {
        let allocator = BuddyAllocator::new(total_kb)?;
        *self.allocator.lock() = Some(allocator);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Allocate under the lock, returning the block size and the call's trace.
    pub fn allocate(&self, size: usize) -> Traced<usize> {
        self.traced(size, AllocError::AllocationFailed, BuddyAllocator::allocate)
    }

    /// Free under the lock, returning the outcome and the call's trace.
    pub fn free(&self, size: usize) -> Traced<()> {
        self.traced(size, AllocError::FreeOfUntrackedSize, BuddyAllocator::free)
    }

    fn traced<T>(
        &self,
        size: usize,
        uninit_err: AllocError,
        op: impl FnOnce(&mut BuddyAllocator, usize) -> AllocResult<T>,
    ) -> Traced<T> {
        if !self.is_initialized() {
            error!("locked allocator: Allocator not initialized");
            return Traced::rejected(uninit_err);
        }

        let mut guard = self.allocator.lock();
        let Some(allocator) = guard.as_mut() else {
            return Traced::rejected(uninit_err);
        };

        let step = allocator.step();
        let result = op(&mut *allocator, size);
        // Invalid sizes never open a step
        let step = if allocator.step() == step { 0 } else { step };
        Traced {
            result,
            step,
            trace: allocator.trace().to_vec(),
        }
    }

    /// Run `f` against the allocator while holding the lock.
    pub fn with<R>(&self, f: impl FnOnce(&BuddyAllocator) -> R) -> Option<R> {
        self.allocator.lock().as_ref().map(f)
    }

    pub fn total_kb(&self) -> usize {
        self.with(BuddyAllocator::total_kb).unwrap_or(0)
    }

    pub fn used_kb(&self) -> usize {
        self.with(|allocator| {
            allocator
                .allocated_blocks()
                .map(|(size, count)| size * count)
                .sum::<usize>()
        })
        .unwrap_or(0)
    }

    pub fn available_kb(&self) -> usize {
        self.with(|allocator| {
            allocator
                .free_blocks()
                .map(|(size, count)| size * count)
                .sum::<usize>()
        })
        .unwrap_or(0)
    }

    /// Get buddy allocator statistics
    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> Option<BuddyStats> {
        self.with(BuddyAllocator::get_stats)
    }
}

impl Default for LockedBuddyAllocator {
    fn default() -> Self {
        Self {
            allocator: SpinNoIrq::new(Some(BuddyAllocator::default())),
            initialized: AtomicBool::new(true),
        }
    }
}
