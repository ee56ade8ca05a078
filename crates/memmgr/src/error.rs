//! Errors surfaced by the memory manager.

use core::fmt;

use crate::{AllocError, FrameNumber, VirtualAddress};

/// Errors that can occur while managing simulated memory.
///
/// No operation that fails leaves partial allocator or page table state behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Not enough free frames to satisfy a growth, fork or process start.
    AllocationExhausted { needed: usize, available: usize },
    /// Grow asked for fewer pages than the address space holds.
    InvalidGrowTarget { current: usize, target: usize },
    /// Shrink asked for more pages than the address space holds.
    InvalidShrinkTarget { current: usize, target: usize },
    /// Growth beyond what a full root table can map.
    LimitExceeded { requested: usize, limit: usize },
    /// The physical buffer cannot hold the requested number of frames.
    BufferTooSmall { required: usize, provided: usize },
    /// More frames than a page table entry can reference.
    TooManyFrames { requested: usize, limit: usize },
    /// The address is not mapped in this address space.
    Unmapped(VirtualAddress),
    /// The address is not aligned for a word access.
    Misaligned(VirtualAddress),
    /// A frame was released that is not currently allocated.
    InvalidRelease(FrameNumber),
}

impl From<AllocError> for MemoryError {
    fn from(err: AllocError) -> Self {
        match err {
            AllocError::Exhausted => MemoryError::AllocationExhausted {
                needed: 1,
                available: 0,
            },
            AllocError::InvalidDeallocation(frame) => MemoryError::InvalidRelease(frame),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationExhausted { needed, available } => write!(
                f,
                "out of frames: {needed} needed, {available} available"
            ),
            Self::InvalidGrowTarget { current, target } => write!(
                f,
                "cannot grow from {current} pages to {target} pages"
            ),
            Self::InvalidShrinkTarget { current, target } => write!(
                f,
                "cannot shrink from {current} pages to {target} pages"
            ),
            Self::LimitExceeded { requested, limit } => write!(
                f,
                "{requested} pages requested but an address space maps at most {limit}"
            ),
            Self::BufferTooSmall { required, provided } => write!(
                f,
                "physical buffer holds {provided} bytes, {required} required"
            ),
            Self::TooManyFrames { requested, limit } => write!(
                f,
                "{requested} frames requested but entries can reference at most {limit}"
            ),
            Self::Unmapped(addr) => write!(f, "address {addr} is not mapped"),
            Self::Misaligned(addr) => write!(f, "address {addr} is not word aligned"),
            Self::InvalidRelease(frame) => write!(f, "frame {frame} is not allocated"),
        }
    }
}

impl core::error::Error for MemoryError {}
