//! Simulated processes.
//!
//! Each process other than the first runs on its own scoped thread and owns one
//! [`AddressSpace`]. The [`Process`] handle is everything process code sees: the page count,
//! resizing, word access through the page tables, and spawning children.

use core::mem::ManuallyDrop;
use std::sync::{Condvar, Mutex, PoisonError};
use std::thread::Scope;

use crate::manager::Machine;
use crate::{AddressSpace, FrameNumber, MemoryError, PhysicalAddress, VirtualAddress, arch};

/// Counts spawned processes that have not finished yet.
///
/// The first process is not counted; the manager waits on this counter before tearing it down.
pub(crate) struct ProcessCounter {
    live: Mutex<usize>,
    idle: Condvar,
}

impl ProcessCounter {
    pub(crate) const fn new() -> Self {
        Self {
            live: Mutex::new(0),
            idle: Condvar::new(),
        }
    }

    /// Records a process about to start.
    pub(crate) fn enter(&self) {
        *self.live.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    /// Records a finished process, waking waiters when none remain.
    pub(crate) fn exit(&self) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        *live -= 1;
        if *live == 0 {
            self.idle.notify_all();
        }
    }

    /// Blocks until no counted process is running. Returns immediately if none are.
    pub(crate) fn wait_idle(&self) {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        while *live != 0 {
            live = self
                .idle
                .wait(live)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the number of counted processes still running.
    pub(crate) fn live(&self) -> usize {
        *self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Identifier assigned to each process in start order, beginning at 1 for the first process.
pub type ProcessId = usize;

/// Handle given to simulated process code.
///
/// Dropping the handle ends the process: its address space is destroyed and, for spawned
/// processes, the live-process count is decremented. This runs on every exit path, including
/// unwinding out of the entry function.
pub struct Process<'scope, 'env: 'scope> {
    machine: &'env Machine<'env>,
    scope: &'scope Scope<'scope, 'env>,
    space: ManuallyDrop<AddressSpace>,
    pid: ProcessId,
    counted: bool,
}

impl<'scope, 'env> Process<'scope, 'env> {
    pub(crate) fn new(
        machine: &'env Machine<'env>,
        scope: &'scope Scope<'scope, 'env>,
        space: AddressSpace,
        counted: bool,
    ) -> Self {
        let pid = machine.next_pid();
        log::debug!("process {pid} started with {} pages", space.page_count());
        Self {
            machine,
            scope,
            space: ManuallyDrop::new(space),
            pid,
            counted,
        }
    }

    /// Returns this process's identifier.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Returns the number of pages mapped in this process.
    pub fn page_count(&self) -> usize {
        self.space.page_count()
    }

    /// Returns the address space backing this process.
    pub fn address_space(&self) -> &AddressSpace {
        &self.space
    }

    /// Lists the frames this process holds, page tables included.
    pub fn held_frames(&self) -> Vec<FrameNumber> {
        self.space.held_frames(&self.machine.memory)
    }

    /// Returns the number of frames left in the shared pool.
    pub fn free_frames(&self) -> usize {
        self.machine.frames.lock().available()
    }

    /// Sets this process's memory size in pages.
    ///
    /// On failure the address space is left exactly as it was.
    pub fn resize(&mut self, pages: usize) -> Result<(), MemoryError> {
        let mut frames = self.machine.frames.lock();
        self.space.resize(pages, &mut frames, &self.machine.memory)
    }

    /// Starts a child process running `entry(child, arg)` on its own thread.
    ///
    /// With `copy` set the child receives a private copy of this process's memory; otherwise it
    /// starts with no pages. The caller does not wait for the child. If the child's address
    /// space cannot be built nothing is spawned.
    pub fn spawn_child<A, F>(&self, arg: A, entry: F, copy: bool) -> Result<(), MemoryError>
    where
        A: Send + 'scope,
        F: FnOnce(&mut Process<'scope, 'env>, A) + Send + 'scope,
    {
        let space = {
            let mut frames = self.machine.frames.lock();
            self.space.fork(copy, &mut frames, &self.machine.memory)?
        };

        self.machine.processes.enter();
        log::debug!(
            "process {} spawning child (copy: {copy}, {} pages)",
            self.pid,
            space.page_count()
        );

        let machine = self.machine;
        let scope = self.scope;
        scope.spawn(move || {
            let mut child = Process::new(machine, scope, space, true);
            entry(&mut child, arg);
        });
        Ok(())
    }

    /// Reads the word at `address`.
    pub fn read_u32(&self, address: VirtualAddress) -> Result<u32, MemoryError> {
        let phys = self.resolve(address)?;
        Ok(self.machine.memory.read_u32(phys))
    }

    /// Writes `value` to the word at `address`.
    pub fn write_u32(&mut self, address: VirtualAddress, value: u32) -> Result<(), MemoryError> {
        let phys = self.resolve(address)?;
        self.machine.memory.write_u32(phys, value);
        Ok(())
    }

    fn resolve(&self, address: VirtualAddress) -> Result<PhysicalAddress, MemoryError> {
        if !address.is_aligned(arch::ENTRY_SIZE) {
            return Err(MemoryError::Misaligned(address));
        }
        // Only this process mutates its own tables, so no lock is needed to walk them.
        self.space
            .translate(&self.machine.memory, address)
            .ok_or(MemoryError::Unmapped(address))
    }
}

impl Drop for Process<'_, '_> {
    fn drop(&mut self) {
        // SAFETY: `space` is not used again; the handle is going away.
        let space = unsafe { ManuallyDrop::take(&mut self.space) };
        let held = space.frames_held();
        space.destroy(&mut self.machine.frames.lock(), &self.machine.memory);
        log::debug!("process {} finished, released {held} frames", self.pid);

        if self.counted {
            self.machine.processes.exit();
        }
    }
}
