//! Paging geometry.
//!
//! The geometry is fixed at compile time. The full layout is the classic 32-bit two-level scheme;
//! the scale model shrinks every dimension so table-boundary behavior can be exercised with a
//! handful of frames.

// Use the full geometry unless testing or emulating at scale. It is always compiled so its
// checks run in every build.
#[cfg_attr(any(test, feature = "scale-model"), allow(dead_code))]
mod i386;
#[cfg(not(any(test, feature = "scale-model")))]
pub use i386::*;

// Use the scale model ONLY when:
// - Running tests, OR
// - scale-model feature is explicitly enabled
#[cfg(any(test, feature = "scale-model"))]
mod scale;
#[cfg(any(test, feature = "scale-model"))]
pub use scale::*;

/// Size of one encoded page table entry in bytes.
pub const ENTRY_SIZE: usize = core::mem::size_of::<u32>();

/// Number of entries in each page table (root or second level).
///
/// A table occupies exactly one frame.
pub const ENTRY_COUNT: usize = PAGE_SIZE / ENTRY_SIZE;

/// Number of bits used to index one table level.
pub const INDEX_BITS: usize = ENTRY_COUNT.trailing_zeros() as usize;

/// Mask selecting the page offset from an address.
pub const OFFSET_MASK: usize = PAGE_SIZE - 1;

/// Mask selecting the frame address bits of an encoded entry.
pub const ADDRESS_MASK: u32 = !(OFFSET_MASK as u32);

/// Maximum number of pages a single address space can map (a full root table).
pub const MAX_PAGES: usize = ENTRY_COUNT * ENTRY_COUNT;

/// Returns the table index for a virtual address at the given level.
///
/// Level 0 selects the entry inside a second-level table, level 1 the entry inside the root.
#[inline]
pub const fn page_index(address: usize, level: usize) -> usize {
    assert!(level < PAGE_TABLE_LEVELS, "level out of range");
    let shift = OFFSET_BITS + level * INDEX_BITS;
    (address >> shift) & (ENTRY_COUNT - 1)
}

/// Number of page table levels.
pub const PAGE_TABLE_LEVELS: usize = 2;

/// Number of frames an entry can reference: the frame number must fit above the offset bits
/// of a 32-bit word.
pub const MAX_FRAMES: usize = 1 << (u32::BITS as usize - OFFSET_BITS);

const _: () = assert!(PAGE_SIZE == 1 << OFFSET_BITS);
const _: () = assert!(ENTRY_COUNT.is_power_of_two());
