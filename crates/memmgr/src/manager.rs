//! Memory manager entry point.
//!
//! The manager owns the frame pool for one simulation run. [`MemoryManager::run`] starts the
//! first process on the calling thread, then waits for every process it (transitively) spawned
//! before tearing down.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::process::{ProcessCounter, ProcessId};
use crate::{AddressSpace, FrameAllocator, MemoryError, PhysicalMemory, Process, arch};

/// State shared by every process of one run.
///
/// `frames` is the single structural lock: it guards the free pool and, because every
/// grow/shrink/fork/destroy needs `&mut FrameAllocator`, all page table changes in every
/// address space. `processes` has its own lock and is never taken while `frames` is held.
pub(crate) struct Machine<'m> {
    pub(crate) frames: spin::Mutex<FrameAllocator>,
    pub(crate) memory: PhysicalMemory<'m>,
    pub(crate) processes: ProcessCounter,
    next_pid: AtomicUsize,
}

impl Machine<'_> {
    pub(crate) fn next_pid(&self) -> ProcessId {
        self.next_pid.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Top-level memory manager for a pool of simulated physical frames.
pub struct MemoryManager<'m> {
    machine: Machine<'m>,
}

impl<'m> MemoryManager<'m> {
    /// Creates a manager for `capacity` frames backed by `buffer`.
    ///
    /// The buffer must hold at least `capacity × PAGE_SIZE` bytes. It stays borrowed for the
    /// lifetime of the manager and is never reallocated.
    pub fn new(buffer: &'m mut [u8], capacity: usize) -> Result<Self, MemoryError> {
        let memory = PhysicalMemory::new(buffer, capacity)?;
        log::info!(
            "memory manager: {capacity} frames of {} bytes, {} entries per table",
            arch::PAGE_SIZE,
            arch::ENTRY_COUNT
        );

        Ok(Self {
            machine: Machine {
                frames: spin::Mutex::new(FrameAllocator::new(capacity)),
                memory,
                processes: ProcessCounter::new(),
                next_pid: AtomicUsize::new(0),
            },
        })
    }

    /// Returns the number of free frames.
    pub fn available(&self) -> usize {
        self.machine.frames.lock().available()
    }

    /// Returns the total number of frames managed.
    pub fn total_frames(&self) -> usize {
        self.machine.frames.lock().total_frames()
    }

    /// Returns the number of spawned processes that have not finished.
    pub fn live_processes(&self) -> usize {
        self.machine.processes.live()
    }

    /// Runs `entry(process, arg)` as the first process and waits for all of its descendants.
    ///
    /// The first process runs on the calling thread with an empty address space. Once it
    /// returns, this call blocks until every spawned process has finished, then destroys the
    /// first process's address space. Fails only if there is no frame for the first root table.
    pub fn run<'a, A, F>(&'a self, arg: A, entry: F) -> Result<(), MemoryError>
    where
        F: for<'scope> FnOnce(&mut Process<'scope, 'a>, A),
    {
        let machine: &'a Machine<'a> = &self.machine;
        let space = AddressSpace::new(&mut machine.frames.lock(), &machine.memory)?;

        thread::scope(|scope| {
            let mut init = Process::new(machine, scope, space, false);
            entry(&mut init, arg);

            machine.processes.wait_idle();
            drop(init);
        });

        let frames = machine.frames.lock();
        if frames.allocated_frames() != 0 {
            log::warn!(
                "{} frames still allocated after all processes finished",
                frames.allocated_frames()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameNumber, PageNumber, VirtualAddress};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, Mutex};

    fn buffer(frames: usize) -> Vec<u8> {
        vec![0u8; frames * arch::PAGE_SIZE]
    }

    #[test]
    fn rejects_undersized_buffer() {
        let mut buffer = buffer(2);
        assert!(matches!(
            MemoryManager::new(&mut buffer, 3),
            Err(MemoryError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn rejects_capacity_entries_cannot_encode() {
        let mut buffer = Vec::new();
        assert_eq!(
            MemoryManager::new(&mut buffer, arch::MAX_FRAMES + 1).err(),
            Some(MemoryError::TooManyFrames {
                requested: arch::MAX_FRAMES + 1,
                limit: arch::MAX_FRAMES,
            })
        );
    }

    #[test]
    fn run_fails_without_root_frame() {
        let mut buffer = buffer(0);
        let manager = MemoryManager::new(&mut buffer, 0).unwrap();
        let ran = AtomicUsize::new(0);

        let result = manager.run(&ran, |_, ran| {
            ran.fetch_add(1, Ordering::SeqCst);
        });
        assert!(matches!(
            result,
            Err(MemoryError::AllocationExhausted { .. })
        ));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn first_process_runs_on_caller_thread() {
        let mut buffer = buffer(4);
        let manager = MemoryManager::new(&mut buffer, 4).unwrap();
        let caller = std::thread::current().id();

        manager
            .run(caller, |init, caller| {
                assert_eq!(std::thread::current().id(), caller);
                assert_eq!(init.pid(), 1);
                assert_eq!(init.page_count(), 0);
                assert_eq!(init.free_frames(), 3);
            })
            .unwrap();
        assert_eq!(manager.available(), 4);
    }

    #[test]
    fn resize_scenario_through_process_handle() {
        let mut buffer = buffer(10);
        let manager = MemoryManager::new(&mut buffer, 10).unwrap();

        manager
            .run((), |init, ()| {
                init.resize(5).unwrap();
                assert_eq!(init.free_frames(), 2);

                init.resize(7).unwrap();
                assert_eq!(init.free_frames(), 0);

                assert!(init.resize(8).is_err());
                assert_eq!(init.page_count(), 7);
                assert_eq!(init.free_frames(), 0);

                init.resize(3).unwrap();
                assert_eq!(init.free_frames(), 5);
            })
            .unwrap();
        assert_eq!(manager.available(), 10);
    }

    #[test]
    fn word_access_goes_through_page_tables() {
        let mut buffer = buffer(8);
        let manager = MemoryManager::new(&mut buffer, 8).unwrap();

        manager
            .run((), |init, ()| {
                init.resize(2).unwrap();
                let address = PageNumber::new(1).start() + 4;
                init.write_u32(address, 0xFEED_F00D).unwrap();
                assert_eq!(init.read_u32(address), Ok(0xFEED_F00D));
                assert_eq!(init.read_u32(PageNumber::new(0).start()), Ok(0));

                let unmapped = PageNumber::new(2).start();
                assert_eq!(
                    init.read_u32(unmapped),
                    Err(MemoryError::Unmapped(unmapped))
                );
                let misaligned = VirtualAddress::new(6);
                assert_eq!(
                    init.write_u32(misaligned, 1),
                    Err(MemoryError::Misaligned(misaligned))
                );
            })
            .unwrap();
    }

    #[test]
    fn child_sees_copy_of_parent_memory() {
        let mut buffer = buffer(16);
        let manager = MemoryManager::new(&mut buffer, 16).unwrap();
        let seen = Mutex::new(Vec::new());

        manager
            .run(&seen, |init, seen| {
                init.resize(5).unwrap();
                for page in 0..5 {
                    init.write_u32(PageNumber::new(page).start(), 100 + page as u32)
                        .unwrap();
                }

                init.spawn_child(
                    seen,
                    |child, seen| {
                        let values: Vec<u32> = (0..child.page_count())
                            .map(|page| child.read_u32(PageNumber::new(page).start()).unwrap())
                            .collect();
                        seen.lock().unwrap().extend(values);
                    },
                    true,
                )
                .unwrap();

                // Changes after the fork stay private to the parent.
                init.write_u32(PageNumber::new(0).start(), 0).unwrap();
            })
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![100, 101, 102, 103, 104]);
        assert_eq!(manager.available(), 16);
    }

    #[test]
    fn child_without_copy_starts_empty() {
        let mut buffer = buffer(8);
        let manager = MemoryManager::new(&mut buffer, 8).unwrap();
        let pages = AtomicUsize::new(usize::MAX);

        manager
            .run(&pages, |init, pages| {
                init.resize(3).unwrap();
                init.spawn_child(
                    pages,
                    |child, pages| pages.store(child.page_count(), Ordering::SeqCst),
                    false,
                )
                .unwrap();
            })
            .unwrap();

        assert_eq!(pages.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn oversized_spawn_fails_cleanly() {
        let mut buffer = buffer(12);
        let manager = MemoryManager::new(&mut buffer, 12).unwrap();
        let children = AtomicUsize::new(0);
        let barrier = Barrier::new(2);
        let shared = (&children, &barrier);

        manager
            .run(shared, |init, shared| {
                // 1 root + 1 table + 4 pages
                init.resize(4).unwrap();
                init.spawn_child(
                    shared,
                    |_, (children, barrier)| {
                        children.fetch_add(1, Ordering::SeqCst);
                        // Hold the child's frames until the parent has tried again.
                        barrier.wait();
                    },
                    true,
                )
                .unwrap();
                assert_eq!(init.free_frames(), 0);

                let result = init.spawn_child(
                    shared,
                    |_, (children, _)| {
                        children.fetch_add(1, Ordering::SeqCst);
                    },
                    true,
                );
                assert_eq!(
                    result,
                    Err(MemoryError::AllocationExhausted {
                        needed: 1,
                        available: 0
                    })
                );
                assert_eq!(init.free_frames(), 0);
                assert_eq!(init.page_count(), 4);
                shared.1.wait();
            })
            .unwrap();

        assert_eq!(children.load(Ordering::SeqCst), 1);
        assert_eq!(manager.available(), 12);
        assert_eq!(manager.live_processes(), 0);
    }

    #[test]
    fn waits_for_grandchildren() {
        let mut buffer = buffer(32);
        let manager = MemoryManager::new(&mut buffer, 32).unwrap();
        let finished = AtomicUsize::new(0);

        manager
            .run(&finished, |init, finished| {
                for _ in 0..3 {
                    init.spawn_child(
                        finished,
                        |child, finished| {
                            child.resize(2).unwrap();
                            child
                                .spawn_child(
                                    finished,
                                    |grandchild, finished| {
                                        std::thread::sleep(std::time::Duration::from_millis(10));
                                        assert_eq!(grandchild.page_count(), 2);
                                        finished.fetch_add(1, Ordering::SeqCst);
                                    },
                                    true,
                                )
                                .unwrap();
                            finished.fetch_add(1, Ordering::SeqCst);
                        },
                        false,
                    )
                    .unwrap();
                }
            })
            .unwrap();

        assert_eq!(finished.load(Ordering::SeqCst), 6);
        assert_eq!(manager.available(), 32);
        assert_eq!(manager.live_processes(), 0);
    }

    #[test]
    fn concurrent_processes_never_share_frames() {
        const CHILDREN: usize = 4;
        // init root + per child: root + 2 tables + 8 pages
        const CAPACITY: usize = 1 + CHILDREN * 11;

        let mut buffer = buffer(CAPACITY);
        let manager = MemoryManager::new(&mut buffer, CAPACITY).unwrap();
        let barrier = Barrier::new(CHILDREN);
        let held: Mutex<Vec<Vec<FrameNumber>>> = Mutex::new(Vec::new());
        let shared = (&barrier, &held);

        manager
            .run(shared, |init, shared| {
                for _ in 0..CHILDREN {
                    init.spawn_child(
                        shared,
                        |child, (barrier, held)| {
                            child.resize(8).unwrap();
                            held.lock().unwrap().push(child.held_frames());
                            // Keep every child's frames allocated until all have reported.
                            barrier.wait();
                        },
                        false,
                    )
                    .unwrap();
                }
            })
            .unwrap();

        let held = held.into_inner().unwrap();
        assert_eq!(held.len(), CHILDREN);
        let all: Vec<FrameNumber> = held.into_iter().flatten().collect();
        let unique: HashSet<FrameNumber> = all.iter().copied().collect();
        assert_eq!(all.len(), CHILDREN * 11);
        assert_eq!(unique.len(), all.len());
        assert!(all.iter().all(|frame| frame.as_usize() < CAPACITY));
        assert_eq!(manager.available(), CAPACITY);
    }

    #[test]
    fn racing_spawns_split_remaining_frames() {
        const CHILDREN: usize = 4;
        // root + 1 table + 2 pages, for each child and for each copy of one
        const PER_SPACE: usize = 4;
        // The remaining frames cover every copy but one.
        const WINNERS: usize = CHILDREN - 1;
        const CAPACITY: usize = 1 + CHILDREN * PER_SPACE + WINNERS * PER_SPACE;
        const PARTIES: usize = 1 + CHILDREN + WINNERS;

        let mut buffer = buffer(CAPACITY);
        let manager = MemoryManager::new(&mut buffer, CAPACITY).unwrap();
        let grown = Barrier::new(CHILDREN);
        let spawned = Barrier::new(PARTIES);
        let finish = Barrier::new(PARTIES);
        let held: Mutex<Vec<Vec<FrameNumber>>> = Mutex::new(Vec::new());
        let failures: Mutex<Vec<MemoryError>> = Mutex::new(Vec::new());
        let observed = Mutex::new((usize::MAX, 0));
        let shared = (&grown, &spawned, &finish, &held, &failures);

        manager
            .run((shared, &observed), |init, (shared, observed)| {
                for _ in 0..CHILDREN {
                    init.spawn_child(
                        shared,
                        |child, shared| {
                            let (grown, spawned, finish, held, failures) = shared;
                            child.resize(2).unwrap();
                            held.lock().unwrap().push(child.held_frames());
                            grown.wait();

                            let result = child.spawn_child(
                                shared,
                                |copy, (_, spawned, finish, held, _)| {
                                    held.lock().unwrap().push(copy.held_frames());
                                    spawned.wait();
                                    finish.wait();
                                },
                                true,
                            );
                            if let Err(err) = result {
                                failures.lock().unwrap().push(err);
                            }
                            spawned.wait();
                            finish.wait();
                        },
                        false,
                    )
                    .unwrap();
                }

                // Every process is alive and holding its frames between the two barriers.
                let (_, spawned, finish, held, _) = shared;
                spawned.wait();
                *observed.lock().unwrap() = (init.free_frames(), held.lock().unwrap().len());
                finish.wait();
            })
            .unwrap();

        assert_eq!(observed.into_inner().unwrap(), (0, CHILDREN + WINNERS));
        assert_eq!(
            failures.into_inner().unwrap(),
            vec![MemoryError::AllocationExhausted {
                needed: 1,
                available: 0
            }]
        );

        let all: Vec<FrameNumber> = held.into_inner().unwrap().into_iter().flatten().collect();
        let unique: HashSet<FrameNumber> = all.iter().copied().collect();
        assert_eq!(all.len(), CAPACITY - 1);
        assert_eq!(unique.len(), all.len());
        assert_eq!(manager.available(), CAPACITY);
        assert_eq!(manager.live_processes(), 0);
    }
}
