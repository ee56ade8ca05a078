//! Address space management.
//!
//! An address space is a two-level page table: one root table whose entries reference
//! second-level tables, whose entries in turn reference the frames backing each page. Pages are
//! packed densely from page 0 upwards, so page `n` always lives in second-level table
//! `n / ENTRY_COUNT` at slot `n % ENTRY_COUNT`, and a second-level table exists exactly when at
//! least one of its slots is in use.
//!
//! Every structural operation takes `&mut FrameAllocator`. The memory manager only hands that
//! out through the allocator lock, so holding it also serializes changes to every address space.

use crate::paging::{PageEntry, PageFlags, PageTable};
use crate::{
    FrameAllocator, FrameNumber, MemoryError, PageNumber, PhysicalAddress, PhysicalMemory,
    VirtualAddress, arch,
};

/// The two-level page table owned by one simulated process.
///
/// There is no `Drop` impl: frames can only be returned while holding the allocator, so owners
/// must call [`AddressSpace::destroy`]. Destroy consumes the space, so it cannot run twice.
#[derive(Debug)]
pub struct AddressSpace {
    /// The root table; its frame is held until destroy.
    root: PageTable,
    /// Number of mapped pages.
    pages: usize,
    /// Number of second-level tables referenced from the root.
    tables: usize,
}

impl AddressSpace {
    /// Creates an empty address space, drawing and zeroing a frame for the root table.
    pub fn new(
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) -> Result<Self, MemoryError> {
        let frame = frames.acquire().map_err(|_| MemoryError::AllocationExhausted {
            needed: 1,
            available: frames.available(),
        })?;

        log::trace!("created address space with root table in frame {frame}");
        Ok(Self {
            root: PageTable::create(memory, frame),
            pages: 0,
            tables: 0,
        })
    }

    /// Returns the number of mapped pages.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Returns the number of second-level tables in use.
    pub fn table_count(&self) -> usize {
        self.tables
    }

    /// Returns the frame holding the root table.
    pub fn root_frame(&self) -> FrameNumber {
        self.root.frame()
    }

    /// Returns the number of frames this space holds: root, second-level tables and pages.
    pub fn frames_held(&self) -> usize {
        1 + self.tables + self.pages
    }

    /// Lists every frame held by this space: root first, then each table followed by its pages.
    pub fn held_frames(&self, memory: &PhysicalMemory<'_>) -> Vec<FrameNumber> {
        let mut held = Vec::with_capacity(self.frames_held());
        held.push(self.root.frame());
        for index in 0..self.tables {
            let table = self
                .root
                .next_table(memory, index)
                .expect("second-level table should be present");
            held.push(table.frame());
            held.extend((0..table.len()).filter_map(|slot| table.entry(memory, slot).frame()));
        }
        held
    }

    /// Sets the page count to `target`, growing or shrinking as needed.
    pub fn resize(
        &mut self,
        target: usize,
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) -> Result<(), MemoryError> {
        if target > self.pages {
            self.grow(target, frames, memory)
        } else {
            self.shrink(target, frames, memory)
        }
    }

    /// Grows the space to exactly `target` pages.
    ///
    /// Either every frame needed is available and the space ends at `target` pages, or nothing
    /// changes. The partially filled last table is topped up before new tables are added.
    pub fn grow(
        &mut self,
        target: usize,
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) -> Result<(), MemoryError> {
        if target < self.pages {
            return Err(MemoryError::InvalidGrowTarget {
                current: self.pages,
                target,
            });
        }
        if target > arch::MAX_PAGES {
            return Err(MemoryError::LimitExceeded {
                requested: target,
                limit: arch::MAX_PAGES,
            });
        }

        let tables_needed = target.div_ceil(arch::ENTRY_COUNT);
        let needed = (tables_needed - self.tables) + (target - self.pages);
        let available = frames.available();
        if needed > available {
            log::trace!(
                "grow {} -> {target} pages needs {needed} frames, {available} available",
                self.pages
            );
            return Err(MemoryError::AllocationExhausted { needed, available });
        }

        // The availability check holds for the whole loop: we own the allocator.
        for index in self.tables..tables_needed {
            let table = PageTable::create(memory, frames.acquire()?);
            self.root.set_entry(
                memory,
                index,
                PageEntry::new(table.frame(), PageFlags::user_rw()),
            );
            self.tables += 1;
        }

        for number in self.pages..target {
            let page = PageNumber::new(number);
            let frame = frames.acquire()?;
            memory.zero_frame(frame);
            self.table_of(memory, page).set_entry(
                memory,
                page.slot_index(),
                PageEntry::new(frame, PageFlags::user_rw()),
            );
            self.pages += 1;
        }

        log::trace!(
            "grew address space {} to {} pages in {} tables",
            self.root.frame(),
            self.pages,
            self.tables
        );
        Ok(())
    }

    /// Shrinks the space to `target` pages, releasing pages from the highest index down.
    ///
    /// Always succeeds for `target <= page_count()`. A second-level table is released as soon
    /// as its last page is.
    pub fn shrink(
        &mut self,
        target: usize,
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) -> Result<(), MemoryError> {
        if target > self.pages {
            return Err(MemoryError::InvalidShrinkTarget {
                current: self.pages,
                target,
            });
        }

        self.release_pages(target, frames, memory);
        Ok(())
    }

    fn release_pages(
        &mut self,
        target: usize,
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) {
        while self.pages > target {
            let page = PageNumber::new(self.pages - 1);
            let table = self.table_of(memory, page);

            if let Some(frame) = table.entry(memory, page.slot_index()).frame() {
                frames.release(frame);
            }
            table.clear_entry(memory, page.slot_index());
            self.pages -= 1;

            if page.slot_index() == 0 {
                frames.release(table.frame());
                self.root.clear_entry(memory, page.table_index());
                self.tables -= 1;
            }
        }

        log::trace!(
            "shrank address space {} to {} pages in {} tables",
            self.root.frame(),
            self.pages,
            self.tables
        );
    }

    /// Creates a new address space for a child process.
    ///
    /// With `copy` unset the child starts empty. Otherwise it gets its own frames for every
    /// parent page, filled with a copy of the parent's contents. On failure every frame the
    /// child took is returned before the error is reported.
    pub fn fork(
        &self,
        copy: bool,
        frames: &mut FrameAllocator,
        memory: &PhysicalMemory<'_>,
    ) -> Result<AddressSpace, MemoryError> {
        let mut child = AddressSpace::new(frames, memory)?;
        if !copy {
            return Ok(child);
        }

        if let Err(err) = child.grow(self.pages, frames, memory) {
            child.destroy(frames, memory);
            return Err(err);
        }

        for number in 0..self.pages {
            let page = PageNumber::new(number);
            memory.copy_frame(self.page_frame(memory, page), child.page_frame(memory, page));
        }

        log::trace!(
            "forked address space {} into {} with {} pages",
            self.root.frame(),
            child.root.frame(),
            child.pages
        );
        Ok(child)
    }

    /// Returns every frame held by this space to the allocator.
    pub fn destroy(mut self, frames: &mut FrameAllocator, memory: &PhysicalMemory<'_>) {
        self.release_pages(0, frames, memory);
        frames.release(self.root.frame());
        log::trace!("destroyed address space {}", self.root.frame());
    }

    /// Returns the leaf entry mapping `address`, if both table levels are present.
    pub fn lookup(
        &self,
        memory: &PhysicalMemory<'_>,
        address: VirtualAddress,
    ) -> Option<PageEntry> {
        let table = self.root.next_table(memory, address.root_index())?;
        let entry = table.entry(memory, address.table_index());
        entry.is_present().then_some(entry)
    }

    /// Translates a virtual address to the physical address it maps to.
    pub fn translate(
        &self,
        memory: &PhysicalMemory<'_>,
        address: VirtualAddress,
    ) -> Option<PhysicalAddress> {
        let frame = self.lookup(memory, address)?.frame()?;
        Some(frame.start() + address.page_offset())
    }

    /// Returns the frame backing `page`.
    ///
    /// # Panics
    /// Panics if `page` is not mapped.
    pub fn page_frame(&self, memory: &PhysicalMemory<'_>, page: PageNumber) -> FrameNumber {
        assert!(page.as_usize() < self.pages, "page {page} is not mapped");
        self.table_of(memory, page)
            .entry(memory, page.slot_index())
            .frame()
            .expect("mapped page should have a present entry")
    }

    /// Returns the second-level table holding `page`'s slot.
    fn table_of(&self, memory: &PhysicalMemory<'_>, page: PageNumber) -> PageTable {
        self.root
            .next_table(memory, page.table_index())
            .expect("second-level table should be present")
    }
}
