//! Step-by-step trace of allocator operations
//!
//! The trace is an observable side channel: the allocator appends to it but
//! never reads it back. It holds the lines of the most recent operation only,
//! while the step number keeps counting across operations.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "log")]
use log::trace;

use super::size_class::SizeClassCounts;

/// Ordered, human-readable record of one `allocate`/`free` call.
#[derive(Debug, Clone)]
pub struct Trace {
    lines: Vec<String>,
    step: usize,
}

impl Trace {
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            step: 1,
        }
    }

    /// Lines recorded by the most recent operation.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Label that the next operation will carry.
    pub fn step(&self) -> usize {
        self.step
    }

    /// Drop the previous operation's lines without opening a step.
    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }

    /// Close the current step.
    pub(crate) fn finish_step(&mut self) {
        self.step += 1;
    }

    fn push(&mut self, line: String) {
        trace!("{}", line);
        self.lines.push(line);
    }

    pub(crate) fn begin_allocate(&mut self, requested: usize, block_size: usize) {
        self.clear();
        self.push(format!(
            "{}. Process for allocating {} KB:",
            self.step, requested
        ));
        self.push(format!("   Required block size: {} KB", block_size));
    }

    pub(crate) fn split(&mut self, parent: usize, half: usize) {
        self.push(format!(
            "   Split {} KB block into two {} KB blocks",
            parent, half
        ));
    }

    pub(crate) fn allocated(&mut self, block_size: usize) {
        self.push(format!("   Successfully allocated {} KB block", block_size));
    }

    pub(crate) fn allocation_failed(&mut self) {
        self.push(String::from(
            "   Allocation failed: No suitable memory block available",
        ));
    }

    pub(crate) fn begin_free(&mut self, requested: usize, block_size: usize) {
        self.clear();
        self.push(format!("{}. Process for freeing {} KB:", self.step, requested));
        self.push(format!("   Block size to free: {} KB", block_size));
    }

    pub(crate) fn freed(&mut self, block_size: usize) {
        self.push(format!("   Successfully freed {} KB block", block_size));
        self.push(format!(
            "   Added {} KB block back to free memory",
            block_size
        ));
    }

    pub(crate) fn merged(&mut self, half: usize, merged: usize) {
        self.push(format!(
            "   Merged two {} KB blocks into one {} KB block",
            half, merged
        ));
    }

    pub(crate) fn memory_state(&mut self, free: &SizeClassCounts, allocated: &SizeClassCounts) {
        for line in memory_state_lines(free, allocated) {
            self.push(line);
        }
    }

    pub(crate) fn untracked_free(&mut self) {
        self.push(String::from(
            "   Error: No allocated block of this size found",
        ));
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

/// "Current Memory State" section: free classes then allocated classes,
/// each largest first.
pub(crate) fn memory_state_lines(
    free: &SizeClassCounts,
    allocated: &SizeClassCounts,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(String::new());
    lines.push(String::from("   Current Memory State:"));
    for (size, count) in free.iter().rev() {
        lines.push(format!("   - {} free block(s) of {} KB", count, size));
    }
    for (size, count) in allocated.iter().rev() {
        lines.push(format!("   - {} allocated block(s) of {} KB", count, size));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_starts_at_step_one() {
        let trace = Trace::new();
        assert_eq!(trace.step(), 1);
        assert!(trace.lines().is_empty());
    }

    #[test]
    fn test_begin_resets_lines_but_not_step() {
        let mut trace = Trace::new();
        trace.begin_allocate(100, 128);
        trace.allocated(128);
        trace.finish_step();
        assert_eq!(trace.lines().len(), 3);

        trace.begin_free(100, 128);
        assert_eq!(
            trace.lines(),
            ["2. Process for freeing 100 KB:", "   Block size to free: 128 KB"]
        );
        assert_eq!(trace.step(), 2);
    }

    #[test]
    fn test_memory_state_lines_order() {
        let mut free = SizeClassCounts::new();
        free.add(7, 1);
        free.add(9, 1);
        let mut allocated = SizeClassCounts::new();
        allocated.add(7, 2);
        allocated.add(8, 1);

        assert_eq!(
            memory_state_lines(&free, &allocated),
            [
                "",
                "   Current Memory State:",
                "   - 1 free block(s) of 512 KB",
                "   - 1 free block(s) of 128 KB",
                "   - 1 allocated block(s) of 256 KB",
                "   - 2 allocated block(s) of 128 KB",
            ]
        );
    }
}
