//! Buddy allocator module
//!
//! This module provides the size-class buddy system with:
//! - Per-order block counters for free and allocated blocks
//! - Split-on-allocate and chain coalescing on free
//! - Step-by-step trace output
//! - Statistics and failure reporting

pub mod buddy_allocator;
pub mod size_class;
#[cfg(feature = "tracking")]
pub mod stats;
pub mod trace;

pub use buddy_allocator::BuddyAllocator;
pub use size_class::{block_size_for, order_of, SizeClassCounts, DEFAULT_MAX_ORDER};
#[cfg(feature = "tracking")]
pub use stats::BuddyStats;
pub use trace::Trace;
