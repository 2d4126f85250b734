//! Buddy Trace Allocator
//!
//! This crate simulates a power-of-two buddy allocator over a fixed arena
//! measured in kilobytes, featuring:
//! - Size-class bookkeeping of free and allocated blocks
//! - Splitting on allocation and buddy coalescing on free
//! - A human-readable trace of every step of the most recent operation
//! - A spin-locked wrapper for shared use

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Arena size (in KB) used when none is given.
pub const DEFAULT_ARENA_KB: usize = 1024;

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Requested size is zero or cannot be rounded up to a power of two.
    InvalidSize,
    /// Arena size is zero, not a power of two, or above the largest order.
    InvalidArenaSize,
    /// No free block large enough to satisfy the request.
    AllocationFailed,
    /// Freeing a size class that has no outstanding allocation.
    FreeOfUntrackedSize,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSize => write!(f, "requested size must be a positive number of KB"),
            Self::InvalidArenaSize => write!(
                f,
                "arena size must be a power of two between 1 KB and 2^{} KB",
                DEFAULT_MAX_ORDER
            ),
            Self::AllocationFailed => write!(f, "no suitable memory block available"),
            Self::FreeOfUntrackedSize => write!(f, "no allocated block of this size found"),
        }
    }
}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// Kilobyte-granularity allocator.
pub trait KbAllocator {
    /// Reserve a block for `size` KB, returning the rounded block size.
    fn allocate(&mut self, size: usize) -> AllocResult<usize>;

    /// Release one block of the size class `size` rounds up to.
    fn free(&mut self, size: usize) -> AllocResult;

    /// Returns the arena size in KB.
    fn total_kb(&self) -> usize;

    /// Returns the KB currently held by allocations.
    fn used_kb(&self) -> usize;

    /// Returns the KB currently sitting in free blocks.
    fn available_kb(&self) -> usize;
}

// Export our allocator implementations
pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::BuddyStats;
pub use buddy::{block_size_for, BuddyAllocator, Trace, DEFAULT_MAX_ORDER};

pub mod locked_allocator;
pub use locked_allocator::{LockedBuddyAllocator, Traced};
