//! Page table view.

use crate::{FrameNumber, PhysicalMemory, arch};

use super::entry::PageEntry;

/// A page table stored in one physical frame.
///
/// This is a handle, not an owner: the frame belongs to the address space that built the table,
/// and entries are read and written straight through to physical memory.
///
/// Layout:
/// - `ENTRY_COUNT` little-endian 32-bit words, filling the frame exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTable {
    frame: FrameNumber,
}

impl PageTable {
    /// Returns a view of the table stored in `frame`.
    pub const fn at(frame: FrameNumber) -> Self {
        Self { frame }
    }

    /// Zeroes `frame` and returns it as an empty table.
    pub fn create(memory: &PhysicalMemory<'_>, frame: FrameNumber) -> Self {
        memory.zero_frame(frame);
        Self { frame }
    }

    /// Returns the frame holding this table.
    pub const fn frame(self) -> FrameNumber {
        self.frame
    }

    /// Returns the entry at the given index.
    ///
    /// # Panics
    /// Panics if index >= ENTRY_COUNT.
    pub fn entry(self, memory: &PhysicalMemory<'_>, index: usize) -> PageEntry {
        PageEntry::from_word(memory.read_entry(self.frame, index))
    }

    /// Stores `entry` at the given index.
    ///
    /// # Panics
    /// Panics if index >= ENTRY_COUNT.
    pub fn set_entry(self, memory: &PhysicalMemory<'_>, index: usize, entry: PageEntry) {
        memory.write_entry(self.frame, index, entry.to_word());
    }

    /// Clears the entry at the given index.
    pub fn clear_entry(self, memory: &PhysicalMemory<'_>, index: usize) {
        self.set_entry(memory, index, PageEntry::default());
    }

    /// Returns the table referenced by the entry at `index`, if present.
    pub fn next_table(self, memory: &PhysicalMemory<'_>, index: usize) -> Option<PageTable> {
        self.entry(memory, index).frame().map(PageTable::at)
    }

    /// Returns the number of entries in a page table.
    pub const fn len(self) -> usize {
        arch::ENTRY_COUNT
    }

    /// Counts the present entries in this table.
    pub fn present_count(self, memory: &PhysicalMemory<'_>) -> usize {
        (0..self.len())
            .filter(|&index| self.entry(memory, index).is_present())
            .count()
    }
}
