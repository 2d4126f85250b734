//! Integration tests for the allocator crate
//!
//! Exercises the public allocate/free surface end to end, checking block
//! accounting and the trace each call leaves behind.

#![no_std]

extern crate alloc;
extern crate buddy_trace_allocator;

use alloc::vec::Vec;
use buddy_trace_allocator::{block_size_for, AllocError, BuddyAllocator, KbAllocator};

const ARENA_KB: usize = 1024;

fn free_of(allocator: &BuddyAllocator) -> Vec<(usize, usize)> {
    allocator.free_blocks().collect()
}

fn allocated_of(allocator: &BuddyAllocator) -> Vec<(usize, usize)> {
    allocator.allocated_blocks().collect()
}

/// Sum of every free and allocated block must equal the arena.
fn assert_conserved(allocator: &BuddyAllocator) {
    let free: usize = allocator.free_blocks().map(|(s, c)| s * c).sum();
    let used: usize = allocator.allocated_blocks().map(|(s, c)| s * c).sum();
    assert_eq!(free + used, allocator.total_kb());
}

#[test]
fn test_rounding_reserves_next_power_of_two() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    assert_eq!(allocator.allocate(100), Ok(128));
    assert_eq!(allocator.allocated_count(128), 1);

    for requested in [1, 2, 3, 5, 63, 64, 65, 200] {
        assert_eq!(
            block_size_for(requested).unwrap(),
            requested.next_power_of_two()
        );
    }
}

#[test]
fn test_split_correctness() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    allocator.allocate(128).unwrap();

    assert_eq!(free_of(&allocator), [(128, 1), (256, 1), (512, 1)]);
    assert_eq!(allocated_of(&allocator), [(128, 1)]);
    assert_conserved(&allocator);
}

#[test]
fn test_coalescing_restores_initial_state() {
    for arena in [1, 64, 1024, 4096] {
        let mut allocator = BuddyAllocator::new(arena).unwrap();
        assert_eq!(allocator.allocate(arena), Ok(arena));
        assert_eq!(allocator.free(arena), Ok(()));
        assert_eq!(free_of(&allocator), [(arena, 1)]);
        assert!(allocated_of(&allocator).is_empty());
    }
}

#[test]
fn test_exhaustion() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    for _ in 0..4 {
        assert_eq!(allocator.allocate(256), Ok(256));
    }
    assert!(free_of(&allocator).is_empty());

    assert_eq!(allocator.allocate(256), Err(AllocError::AllocationFailed));
    assert!(free_of(&allocator).is_empty());
    assert_eq!(allocated_of(&allocator), [(256, 4)]);
    assert_conserved(&allocator);

    // Freeing one block makes room again
    allocator.free(256).unwrap();
    assert_eq!(allocator.allocate(256), Ok(256));
}

#[test]
fn test_bad_free_leaves_maps_unchanged() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    allocator.allocate(128).unwrap();
    let free_before = free_of(&allocator);
    let allocated_before = allocated_of(&allocator);

    assert_eq!(allocator.free(64), Err(AllocError::FreeOfUntrackedSize));
    assert_eq!(free_of(&allocator), free_before);
    assert_eq!(allocated_of(&allocator), allocated_before);
    assert_eq!(
        allocator.trace().last().map(|line| line.as_str()),
        Some("   Error: No allocated block of this size found")
    );
}

#[test]
fn test_partial_then_full_coalescing() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    allocator.allocate(128).unwrap();
    allocator.allocate(128).unwrap();

    allocator.free(128).unwrap();
    assert_eq!(allocator.free_count(128), 1);
    assert!(!allocator
        .trace()
        .iter()
        .any(|line| line.contains("Merged")));

    allocator.free(128).unwrap();
    let merges: Vec<_> = allocator
        .trace()
        .iter()
        .filter(|line| line.contains("Merged"))
        .collect();
    assert_eq!(
        merges,
        [
            "   Merged two 128 KB blocks into one 256 KB block",
            "   Merged two 256 KB blocks into one 512 KB block",
            "   Merged two 512 KB blocks into one 1024 KB block",
        ]
    );
    assert_eq!(free_of(&allocator), [(1024, 1)]);
}

#[test]
fn test_non_buddy_blocks_merge_by_count() {
    // Blocks are tracked by size only, so any two free blocks of a class merge.
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    for _ in 0..4 {
        allocator.allocate(256).unwrap();
    }
    allocator.free(256).unwrap();
    allocator.free(256).unwrap();
    assert_eq!(free_of(&allocator), [(512, 1)]);
    assert_eq!(allocated_of(&allocator), [(256, 2)]);
    assert_conserved(&allocator);
}

#[test]
fn test_step_counter_spans_operations() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    allocator.allocate(32).unwrap();
    let _ = allocator.allocate(4096);
    let _ = allocator.free(8);
    allocator.free(32).unwrap();

    assert_eq!(allocator.step(), 5);
    assert_eq!(allocator.trace()[0], "4. Process for freeing 32 KB:");
}

#[test]
fn test_mixed_workload_conserves_arena() {
    let mut allocator = BuddyAllocator::new(ARENA_KB).unwrap();
    let requests = [1, 7, 33, 100, 250, 16, 16, 64];
    let mut granted = Vec::new();

    for &size in &requests {
        if let Ok(block) = allocator.allocate(size) {
            granted.push(block);
        }
        assert_conserved(&allocator);
    }
    assert_eq!(
        allocator.used_kb(),
        granted.iter().sum::<usize>()
    );

    for block in granted.into_iter().rev() {
        allocator.free(block).unwrap();
        assert_conserved(&allocator);
    }
    assert_eq!(allocator.available_kb(), ARENA_KB);
    assert_eq!(free_of(&allocator), [(ARENA_KB, 1)]);
}
