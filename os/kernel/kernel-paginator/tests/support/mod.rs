//! Host stand-ins for physical memory and the MMU.
//!
//! Page-table frames are 4 KiB-aligned heap allocations whose host address
//! doubles as their "physical" address, so identity access is sound in tests.

#![allow(dead_code)]

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_paginator::arch::x86_64::{
    Level, Mmu, PageEntry, PageTable, TableIndices, X86_64PagingController,
};
use kernel_paginator::{ActivationError, FrameAlloc, IdentityAccess, PagingMode};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type HostController = X86_64PagingController<HostRam, SimulatedMmu>;

struct Pool {
    frames: Vec<*mut PageTable>,
    handed_out: usize,
    limit: Option<usize>,
    garbage: bool,
}

impl Pool {
    fn frame(&mut self) -> PhysicalPage<Size4K> {
        let table = Box::into_raw(Box::new(PageTable::zeroed()));
        if self.garbage {
            // SAFETY: freshly allocated, exclusively owned.
            unsafe { table.cast::<u8>().write_bytes(0xA5, size_of::<PageTable>()) };
        }
        self.frames.push(table);
        PhysicalPage::containing(PhysicalAddress::from_ptr(table))
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        for table in self.frames.drain(..) {
            // SAFETY: every pointer came from `Box::into_raw`.
            drop(unsafe { Box::from_raw(table) });
        }
    }
}

/// Shared frame pool; clones hand out frames from the same pool.
#[derive(Clone)]
pub struct HostRam {
    pool: Rc<RefCell<Pool>>,
}

impl HostRam {
    pub fn new() -> Self {
        Self {
            pool: Rc::new(RefCell::new(Pool {
                frames: Vec::new(),
                handed_out: 0,
                limit: None,
                garbage: false,
            })),
        }
    }

    /// Refuse allocations once `limit` frames were handed out.
    pub fn with_limit(limit: usize) -> Self {
        let ram = Self::new();
        ram.set_limit(Some(limit));
        ram
    }

    /// Fill every allocated frame with a non-zero pattern.
    pub fn garbage(self) -> Self {
        self.pool.borrow_mut().garbage = true;
        self
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.pool.borrow_mut().limit = limit;
    }

    /// Frames handed to the paging engine so far.
    pub fn allocated(&self) -> usize {
        self.pool.borrow().handed_out
    }

    /// A zeroed root frame (not counted against the limit).
    pub fn root(&self) -> PhysicalPage<Size4K> {
        let mut pool = self.pool.borrow_mut();
        let garbage = core::mem::replace(&mut pool.garbage, false);
        let root = pool.frame();
        pool.garbage = garbage;
        root
    }
}

impl Default for HostRam {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAlloc for HostRam {
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        let mut pool = self.pool.borrow_mut();
        if pool.limit.is_some_and(|limit| pool.handed_out >= limit) {
            return None;
        }
        pool.handed_out += 1;
        Some(pool.frame())
    }
}

/// Records what the controller asks of the hardware and resolves window
/// addresses by walking the loaded hierarchy like the CPU would.
#[derive(Default)]
pub struct SimulatedMmu {
    loaded: Cell<Option<PhysicalPage<Size4K>>>,
    invalidated: RefCell<Vec<VirtualAddress>>,
}

impl SimulatedMmu {
    pub fn loaded_root(&self) -> Option<PhysicalPage<Size4K>> {
        self.loaded.get()
    }

    pub fn invalidated(&self) -> Vec<VirtualAddress> {
        self.invalidated.borrow().clone()
    }

    pub fn was_invalidated(&self, va: u64) -> bool {
        self.invalidated.borrow().iter().any(|v| v.as_u64() == va)
    }
}

impl Mmu for SimulatedMmu {
    fn invalidate_page(&self, va: VirtualAddress) {
        self.invalidated.borrow_mut().push(va);
    }

    unsafe fn load_root(&self, root: PhysicalPage<Size4K>) -> Result<(), ActivationError> {
        if root.base().is_zero() {
            return Err(ActivationError::InvalidRoot(root.base()));
        }
        self.loaded.set(Some(root));
        Ok(())
    }

    unsafe fn window_table(&self, va: VirtualAddress) -> *mut PageTable {
        let root = self.loaded.get().expect("no hierarchy loaded");
        let ix = TableIndices::of(va).expect("window address must be canonical");

        let mut frame = root;
        for level in Level::TOP_DOWN {
            let e = table(frame).get(ix.at(level));
            assert!(e.present(), "{va} faults at {level:?}");
            frame = e.frame();
        }
        frame.base().as_u64() as *mut PageTable
    }
}

/// The table stored in a host frame.
pub fn table<'a>(frame: PhysicalPage<Size4K>) -> &'a mut PageTable {
    // SAFETY: test frames are host allocations that outlive the test body.
    unsafe { &mut *(frame.base().as_u64() as *mut PageTable) }
}

/// The entry for `va` at `level`, or `None` if the walk stops above it.
pub fn entry(root: PhysicalPage<Size4K>, va: u64, level: Level) -> Option<PageEntry> {
    let ix = TableIndices::of(VirtualAddress::new(va))?;
    let mut frame = root;
    for current in Level::TOP_DOWN {
        let e = table(frame).get(ix.at(current));
        if current == level {
            return Some(e);
        }
        if !e.present() {
            return None;
        }
        frame = e.frame();
    }
    None
}

/// A controller in identity mode over host frames.
pub fn identity_controller(ram: &HostRam) -> HostController {
    // SAFETY: host frames are addressable at their "physical" address.
    unsafe {
        X86_64PagingController::new(
            ram.root(),
            ram.clone(),
            SimulatedMmu::default(),
            PagingMode::Disabled(IdentityAccess::assume()),
        )
    }
}

pub fn va(v: u64) -> VirtualAddress {
    VirtualAddress::new(v)
}

pub fn pa(p: u64) -> PhysicalAddress {
    PhysicalAddress::new(p)
}
