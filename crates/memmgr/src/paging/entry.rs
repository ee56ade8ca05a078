//! Page table entry encoding.

use crate::{FrameNumber, arch};

use super::flags::PageFlags;

/// A single page table entry.
///
/// The entry is one 32-bit word:
/// - Bits `0..OFFSET_BITS`: flags (only bits 0-2 are defined)
/// - Bits `OFFSET_BITS..32`: frame number
///
/// Root entries reference the frame holding a second-level table; second-level entries
/// reference the frame backing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct PageEntry(u32);

impl PageEntry {
    /// Flag bits mask (everything below the frame address).
    const FLAGS_MASK: u32 = !arch::ADDRESS_MASK;

    /// Creates a new page table entry referencing `frame`.
    pub fn new(frame: FrameNumber, flags: PageFlags) -> Self {
        debug_assert!(
            frame.as_usize() <= (arch::ADDRESS_MASK >> arch::OFFSET_BITS) as usize,
            "frame number does not fit in an entry"
        );
        Self(frame.to_entry_bits() | (flags.to_raw() & Self::FLAGS_MASK))
    }

    /// Returns the frame referenced by this entry.
    ///
    /// Returns None if the entry is not present.
    pub fn frame(self) -> Option<FrameNumber> {
        if self.is_present() {
            Some(FrameNumber::from_entry_bits(self.0))
        } else {
            None
        }
    }

    /// Returns the flags for this entry.
    pub fn flags(self) -> PageFlags {
        PageFlags::from_raw(self.0 & Self::FLAGS_MASK)
    }

    /// Returns whether this entry is present (valid).
    pub fn is_present(self) -> bool {
        self.flags().is_present()
    }

    /// Clears this entry (sets it to zero).
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Returns the encoded word.
    pub const fn to_word(self) -> u32 {
        self.0
    }

    /// Decodes an entry from its word.
    pub const fn from_word(word: u32) -> Self {
        Self(word)
    }
}
