//! Size-class bookkeeping
//!
//! A size class is a power-of-two block size in KB. Classes are indexed by
//! order, with `block_size = 1 << order`.

use crate::{AllocError, AllocResult};

#[cfg(feature = "log")]
use log::error;

/// Maximum order supported
pub const DEFAULT_MAX_ORDER: usize = 28; // Support up to 256GB arenas (2^28 KB)

/// Round a requested size up to the smallest power-of-two block that holds it.
///
/// `block_size_for(100) == Ok(128)`. Zero, and sizes whose round-up would
/// overflow `usize`, are rejected with [`AllocError::InvalidSize`]; an
/// overflowing size is treated as invalid input rather than an allocation failure.
pub fn block_size_for(requested: usize) -> AllocResult<usize> {
    if requested == 0 {
        return Err(AllocError::InvalidSize);
    }
    requested
        .checked_next_power_of_two()
        .ok_or(AllocError::InvalidSize)
}

/// Order of a power-of-two block size.
#[inline]
pub const fn order_of(block_size: usize) -> usize {
    block_size.trailing_zeros() as usize
}

/// Number of blocks held in each size class.
///
/// Classes with a zero count are never reported by the iterators, so there
/// is nothing to prune after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeClassCounts {
    counts: [usize; DEFAULT_MAX_ORDER + 1],
}

impl SizeClassCounts {
    pub const fn new() -> Self {
        Self {
            counts: [0; DEFAULT_MAX_ORDER + 1],
        }
    }

    /// Block count for `order`; orders past the maximum hold nothing.
    pub fn get(&self, order: usize) -> usize {
        self.counts.get(order).copied().unwrap_or(0)
    }

    /// Add `n` blocks to `order`.
    pub fn add(&mut self, order: usize, n: usize) -> bool {
        match self.counts.get_mut(order) {
            Some(count) => {
                *count += n;
                true
            }
            None => {
                error!(
                    "size class: order {} exceeds maximum order {}",
                    order, DEFAULT_MAX_ORDER
                );
                false
            }
        }
    }

    /// Remove `n` blocks from `order`, leaving the count untouched if fewer are held.
    pub fn take(&mut self, order: usize, n: usize) -> bool {
        match self.counts.get_mut(order) {
            Some(count) if *count >= n => {
                *count -= n;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.counts = [0; DEFAULT_MAX_ORDER + 1];
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&count| count == 0)
    }

    /// Sum of `block_size * count` over every class.
    pub fn total_kb(&self) -> usize {
        self.iter().map(|(size, count)| size * count).sum()
    }

    /// `(block_size, count)` pairs with a positive count, smallest size first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, usize)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(order, &count)| (1usize << order, count))
    }
}

impl Default for SizeClassCounts {
    fn default() -> Self {
        Self::new()
    }
}
