//! View over the externally owned physical buffer.
//!
//! The memory manager never allocates simulated memory itself. The host hands over a byte
//! buffer of at least `capacity × PAGE_SIZE` bytes and every frame, including the frames that
//! hold page tables, lives inside it.

use core::marker::PhantomData;
use core::ptr::{self, NonNull};

use crate::{FrameNumber, MemoryError, PhysicalAddress, arch};

/// Shared handle to the simulated physical memory.
///
/// Frames are accessed through raw pointers so that separate threads can work on separate
/// frames at the same time. Soundness rests on frame ownership: a frame is only touched by the
/// address space it is allocated to, and structural changes happen under the allocator lock.
pub struct PhysicalMemory<'m> {
    base: NonNull<u8>,
    frames: usize,
    _buffer: PhantomData<&'m mut [u8]>,
}

// SAFETY: The buffer is exclusively borrowed for 'm, and concurrent access is partitioned by
// frame ownership (see the type-level documentation).
unsafe impl Send for PhysicalMemory<'_> {}
unsafe impl Sync for PhysicalMemory<'_> {}

impl<'m> PhysicalMemory<'m> {
    /// Wraps `buffer` as `frames` physical frames.
    ///
    /// Fails if the buffer is too small, or if `frames` exceeds what a page table entry can
    /// encode.
    pub fn new(buffer: &'m mut [u8], frames: usize) -> Result<Self, MemoryError> {
        if frames > arch::MAX_FRAMES {
            return Err(MemoryError::TooManyFrames {
                requested: frames,
                limit: arch::MAX_FRAMES,
            });
        }

        let required = frames * arch::PAGE_SIZE;
        if buffer.len() < required {
            return Err(MemoryError::BufferTooSmall {
                required,
                provided: buffer.len(),
            });
        }

        Ok(Self {
            base: NonNull::from(buffer).cast(),
            frames,
            _buffer: PhantomData,
        })
    }

    /// Returns the number of frames backed by the buffer.
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Translates a physical address to a pointer into the buffer.
    ///
    /// # Panics
    /// Panics if `len` bytes starting at `phys` do not fit in the managed frames.
    fn translate(&self, phys: PhysicalAddress, len: usize) -> *mut u8 {
        let end = phys.as_usize() + len;
        assert!(
            end <= self.frames * arch::PAGE_SIZE,
            "physical address {phys} out of bounds"
        );
        // SAFETY: Bounds checked above against the borrowed buffer.
        unsafe { self.base.as_ptr().add(phys.as_usize()) }
    }

    /// Reads the `index`-th entry word of the table stored in `frame`.
    pub(crate) fn read_entry(&self, frame: FrameNumber, index: usize) -> u32 {
        assert!(index < arch::ENTRY_COUNT, "page table index out of bounds");
        self.read_u32(frame.start() + index * arch::ENTRY_SIZE)
    }

    /// Writes the `index`-th entry word of the table stored in `frame`.
    pub(crate) fn write_entry(&self, frame: FrameNumber, index: usize, word: u32) {
        assert!(index < arch::ENTRY_COUNT, "page table index out of bounds");
        self.write_u32(frame.start() + index * arch::ENTRY_SIZE, word);
    }

    /// Reads a little-endian word at a physical address.
    pub(crate) fn read_u32(&self, phys: PhysicalAddress) -> u32 {
        let ptr = self.translate(phys, arch::ENTRY_SIZE).cast::<u32>();
        // SAFETY: In bounds; the buffer carries no alignment guarantee.
        u32::from_le(unsafe { ptr.read_unaligned() })
    }

    /// Writes a little-endian word at a physical address.
    pub(crate) fn write_u32(&self, phys: PhysicalAddress, value: u32) {
        let ptr = self.translate(phys, arch::ENTRY_SIZE).cast::<u32>();
        // SAFETY: In bounds; the buffer carries no alignment guarantee.
        unsafe { ptr.write_unaligned(value.to_le()) }
    }

    /// Fills a frame with zeros.
    pub(crate) fn zero_frame(&self, frame: FrameNumber) {
        let ptr = self.translate(frame.start(), arch::PAGE_SIZE);
        // SAFETY: The whole frame is in bounds.
        unsafe { ptr::write_bytes(ptr, 0, arch::PAGE_SIZE) }
    }

    /// Copies the contents of frame `src` into frame `dst`.
    ///
    /// # Panics
    /// Panics if `src` and `dst` are the same frame.
    pub(crate) fn copy_frame(&self, src: FrameNumber, dst: FrameNumber) {
        assert_ne!(src, dst, "cannot copy a frame onto itself");
        let from = self.translate(src.start(), arch::PAGE_SIZE);
        let to = self.translate(dst.start(), arch::PAGE_SIZE);
        // SAFETY: Both frames are in bounds and distinct frames never overlap.
        unsafe { ptr::copy_nonoverlapping(from, to, arch::PAGE_SIZE) }
    }

    /// Returns a copy of the bytes stored in `frame`.
    pub fn frame_bytes(&self, frame: FrameNumber) -> [u8; arch::PAGE_SIZE] {
        let mut bytes = [0u8; arch::PAGE_SIZE];
        let ptr = self.translate(frame.start(), arch::PAGE_SIZE);
        // SAFETY: The whole frame is in bounds and `bytes` is a separate stack buffer.
        unsafe { ptr::copy_nonoverlapping(ptr, bytes.as_mut_ptr(), arch::PAGE_SIZE) }
        bytes
    }
}
