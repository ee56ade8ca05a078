//! Scale model of 32-bit two-level paging for testing and development.
//!
//! - 16-byte pages (vs 4 KiB)
//! - 4-entry tables (vs 1024)
//! - 8-bit virtual address space: 2 bits root index, 2 bits table index, 4 bits offset
//!
//! Entries keep the full 32-bit encoding, so the same encode/decode paths run in both geometries.

/// Page size in bytes (16 bytes = 2^4).
pub const PAGE_SIZE: usize = 16;

/// Number of low address bits addressing a byte within a page.
pub const OFFSET_BITS: usize = 4;
