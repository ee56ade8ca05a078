//! Page and frame number types.
//!
//! Frames index the physical buffer; pages index the dense, left-to-right sequence of leaf
//! slots in an address space.

use core::fmt;

use crate::{PhysicalAddress, VirtualAddress, arch};

/// Macro to define common page/frame number functionality.
macro_rules! impl_page_number_common {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Creates a new page/frame number.
            #[inline]
            pub const fn new(number: usize) -> Self {
                Self(number)
            }

            /// Returns the raw page/frame number.
            #[inline]
            pub const fn as_usize(self) -> usize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_page_number_common!(
    FrameNumber,
    "A physical frame number.\n\n\
     Frame numbers are zero-indexed into the physical buffer and correspond to\n\
     PAGE_SIZE-aligned physical addresses."
);

impl FrameNumber {
    /// Returns the physical address at the start of this frame.
    #[inline]
    pub const fn start(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 * arch::PAGE_SIZE)
    }

    /// Encodes this frame into the address bits of a page table entry.
    #[inline]
    pub const fn to_entry_bits(self) -> u32 {
        ((self.0 as u32) << arch::OFFSET_BITS) & arch::ADDRESS_MASK
    }

    /// Decodes the frame referenced by the address bits of a page table entry.
    #[inline]
    pub const fn from_entry_bits(bits: u32) -> Self {
        Self(((bits & arch::ADDRESS_MASK) >> arch::OFFSET_BITS) as usize)
    }
}

impl_page_number_common!(
    PageNumber,
    "A virtual page number within one address space.\n\n\
     Page `n` lives in second-level table `n / ENTRY_COUNT`, slot `n % ENTRY_COUNT`."
);

impl PageNumber {
    /// Returns the index of the root entry whose table holds this page.
    #[inline]
    pub const fn table_index(self) -> usize {
        self.0 / arch::ENTRY_COUNT
    }

    /// Returns the slot of this page inside its second-level table.
    #[inline]
    pub const fn slot_index(self) -> usize {
        self.0 % arch::ENTRY_COUNT
    }

    /// Returns the virtual address at the start of this page.
    #[inline]
    pub const fn start(self) -> VirtualAddress {
        VirtualAddress::new(self.0 * arch::PAGE_SIZE)
    }
}
