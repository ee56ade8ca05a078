//! Classic 32-bit two-level paging: 4 KiB pages and 1024-entry tables.

/// Page size in bytes (4 KiB = 2^12).
pub const PAGE_SIZE: usize = 4096;

/// Number of low address bits addressing a byte within a page.
pub const OFFSET_BITS: usize = 12;

const _: () = assert!(PAGE_SIZE / core::mem::size_of::<u32>() == 1024);
const _: () = assert!(!(PAGE_SIZE as u32 - 1) == 0xFFFF_F000);
// The root index sits above the page offset and one 10-bit table index.
const _: () = assert!(OFFSET_BITS + (PAGE_SIZE / 4).trailing_zeros() as usize == 22);
