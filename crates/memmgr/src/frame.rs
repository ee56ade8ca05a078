use crate::FrameNumber;

/// Per-frame state bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlag {
    /// Frame is handed out to an address space.
    Allocated = 1 << 0,
}

/// Flags for a physical frame.
///
/// Only mutated under the allocator lock, so plain bits suffice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    /// Creates a new `FrameFlags` instance with all flags cleared.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Sets the given flag.
    pub fn set(&mut self, flag: FrameFlag) {
        self.0 |= flag as u8;
    }

    /// Clears the given flag.
    pub fn clear(&mut self, flag: FrameFlag) {
        self.0 &= !(flag as u8);
    }

    /// Tests if the given flag is set.
    pub fn test(self, flag: FrameFlag) -> bool {
        (self.0 & flag as u8) != 0
    }
}

/// Metadata for one physical frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// The frame this metadata describes.
    pub number: FrameNumber,
    /// Flags identifying the state of this frame.
    pub flags: FrameFlags,
}

impl Frame {
    /// Creates free metadata for `number`.
    pub const fn new(number: FrameNumber) -> Self {
        Self {
            number,
            flags: FrameFlags::new(),
        }
    }

    /// Returns true if the frame is currently handed out.
    pub fn is_allocated(&self) -> bool {
        self.flags.test(FrameFlag::Allocated)
    }
}
