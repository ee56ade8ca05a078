//! # Paging Memory Manager
//!
//! A simulated kernel memory manager. A fixed pool of physical frames, carved out of a buffer
//! supplied by the host, is shared among concurrently running simulated processes. It provides:
//!
//! - A frame allocator with fail-fast acquisition.
//! - Per-process two-level page tables stored inside the simulated frames.
//! - Atomic growth, total shrinking, and fork with optional copy of an address space.
//! - Scoped process threads and a manager that waits for every descendant before teardown.
//!
//! Paging geometry is fixed at compile time; tests and the `scale-model` feature use a
//! miniature layout with 16-byte pages and 4-entry tables.

mod address;
mod address_space;
pub mod arch;
pub mod console;
mod error;
mod frame;
mod frame_allocator;
mod manager;
mod numbers;
pub mod paging;
mod physical_memory;
mod process;

pub use address::{PhysicalAddress, VirtualAddress};
pub use address_space::AddressSpace;
pub use arch::{ENTRY_COUNT, PAGE_SIZE};
pub use error::MemoryError;
pub use frame::{Frame, FrameFlag, FrameFlags};
pub use frame_allocator::{AllocError, FrameAllocator};
pub use manager::MemoryManager;
pub use numbers::{FrameNumber, PageNumber};
pub use physical_memory::PhysicalMemory;
pub use process::{Process, ProcessId};
