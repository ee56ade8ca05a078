//! Address types for the simulated physical and virtual memory.
//!
//! Physical addresses are byte offsets into the externally owned buffer. Virtual addresses are
//! decoded by the same constants that encode page table entries, so the two paths agree
//! bit-for-bit.

use core::fmt;
use core::ops::Add;

use crate::{FrameNumber, PageNumber, arch};

/// Macro to define common address type functionality.
///
/// This macro generates the basic structure and methods common to both physical
/// and virtual address types.
macro_rules! impl_address_common {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Creates a new address.
            #[inline]
            pub const fn new(addr: usize) -> Self {
                Self(addr)
            }

            /// Returns the raw address value.
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// Returns the byte offset of this address within its page.
            #[inline]
            pub const fn page_offset(self) -> usize {
                self.0 & arch::OFFSET_MASK
            }

            /// Checks if the address is aligned to the given alignment.
            ///
            /// # Panics
            ///
            /// Panics if `align` is not a power of two.
            #[inline]
            pub const fn is_aligned(self, align: usize) -> bool {
                assert!(align.is_power_of_two(), "alignment must be a power of two");
                self.0 & (align - 1) == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(addr: usize) -> Self {
                Self::new(addr)
            }
        }

        impl Add<usize> for $name {
            type Output = Self;

            #[inline]
            fn add(self, rhs: usize) -> Self::Output {
                Self::new(self.0 + rhs)
            }
        }
    };
}

impl_address_common!(
    PhysicalAddress,
    "A physical memory address.\n\n\
     A byte offset into the physical buffer handed to the memory manager."
);

impl PhysicalAddress {
    /// Returns the frame containing this address.
    #[inline]
    pub const fn frame_number(self) -> FrameNumber {
        FrameNumber::new(self.0 >> arch::OFFSET_BITS)
    }
}

impl_address_common!(
    VirtualAddress,
    "A virtual memory address inside one simulated process.\n\n\
     Bits above the offset select a root entry and a second-level slot."
);

impl VirtualAddress {
    /// Returns the index of the root table entry for this address.
    #[inline]
    pub const fn root_index(self) -> usize {
        arch::page_index(self.0, 1)
    }

    /// Returns the index of the second-level table entry for this address.
    #[inline]
    pub const fn table_index(self) -> usize {
        arch::page_index(self.0, 0)
    }

    /// Returns the page containing this address.
    #[inline]
    pub const fn page_number(self) -> PageNumber {
        PageNumber::new(self.0 >> arch::OFFSET_BITS)
    }
}
