//! Physical frame allocator.
//!
//! A fixed pool of frames handed out from a LIFO stack. The allocator itself is not
//! synchronized; the memory manager wraps it in the lock that also serializes every
//! address-space structural change, so composite operations (check N available, then take N)
//! are atomic for whoever holds the guard.

use crate::frame::{Frame, FrameFlag};
use crate::FrameNumber;

/// Errors that can occur during frame allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The free pool is empty.
    Exhausted,
    /// Attempted to release a frame that is out of range or not allocated.
    InvalidDeallocation(FrameNumber),
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exhausted => write!(f, "no free frames"),
            Self::InvalidDeallocation(frame) => {
                write!(f, "frame {frame} is not allocated")
            }
        }
    }
}

impl core::error::Error for AllocError {}

/// Pool of free physical frames.
pub struct FrameAllocator {
    frames: Vec<Frame>,
    free: Vec<FrameNumber>,
}

impl FrameAllocator {
    /// Creates an allocator owning frames `0..capacity`, all free.
    ///
    /// Frames are handed out in ascending order until the first release.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: (0..capacity).map(|n| Frame::new(FrameNumber::new(n))).collect(),
            free: (0..capacity).rev().map(FrameNumber::new).collect(),
        }
    }

    /// Takes one frame from the pool. Never blocks.
    pub fn acquire(&mut self) -> Result<FrameNumber, AllocError> {
        let number = self.free.pop().ok_or(AllocError::Exhausted)?;
        self.frames[number.as_usize()].flags.set(FrameFlag::Allocated);
        Ok(number)
    }

    /// Returns a frame to the pool.
    ///
    /// Releasing a frame that is not allocated is rejected, leaving the pool untouched.
    pub fn try_release(&mut self, number: FrameNumber) -> Result<(), AllocError> {
        let frame = self
            .frames
            .get_mut(number.as_usize())
            .filter(|frame| frame.is_allocated())
            .ok_or(AllocError::InvalidDeallocation(number))?;
        frame.flags.clear(FrameFlag::Allocated);
        self.free.push(number);
        Ok(())
    }

    /// Returns a frame to the pool, logging and ignoring invalid releases.
    pub fn release(&mut self, number: FrameNumber) {
        if let Err(err) = self.try_release(number) {
            log::error!("rejected frame release: {err}");
        }
    }

    /// Returns the number of free frames.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Returns the total number of frames managed by this allocator.
    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames currently handed out.
    pub fn allocated_frames(&self) -> usize {
        self.total_frames() - self.available()
    }

    /// Returns true if `number` is currently handed out.
    pub fn is_allocated(&self, number: FrameNumber) -> bool {
        self.frames
            .get(number.as_usize())
            .is_some_and(Frame::is_allocated)
    }
}
