//! # Four-level walk
//!
//! Every operation of the controller funnels through [`Walker`]: it reads and
//! writes table entries top-down, allocating missing intermediate tables on
//! the way when asked to.
//!
//! ## Addressing
//!
//! A table is identified by its frame *and* by its position on the walk. With
//! paging disabled the frame is dereferenced directly (through
//! [`IdentityAccess`](crate::IdentityAccess)); with paging enabled the
//! position selects the table's address in the [recursive window](RecursiveWindow).
//! Both are always carried along so the walk reads the same in either mode.
//!
//! ## Consistency
//!
//! A new table is linked into its parent *before* it is cleared, because in
//! paging-enabled mode the window can only reach linked tables. Nothing walks
//! the half-built branch in between, and the leaf is written last, so an
//! allocation failure leaves linked but empty tables and no visible mapping.

use crate::arch::x86_64::{
    ArchFlags, Level, Mmu, PageEntry, PageTable, RecursiveWindow, TableIndex, TableIndices,
};
use crate::controller::PagingMode;
use crate::error::{ActivationError, MapError};
use crate::flags::PageFlags;
use crate::frame_alloc::FrameAlloc;
use crate::info::PHYSICAL_ADDRESS_LIMIT;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use log::{debug, error, trace, warn};

/// One walk over the hierarchy rooted at `root`.
pub struct Walker<'m, M: Mmu> {
    root: PhysicalPage<Size4K>,
    mode: PagingMode,
    mmu: &'m M,
    /// Whether cached translations can exist for this hierarchy.
    live: bool,
}

impl<'m, M: Mmu> Walker<'m, M> {
    #[inline]
    pub const fn new(root: PhysicalPage<Size4K>, mode: PagingMode, mmu: &'m M, live: bool) -> Self {
        Self {
            root,
            mode,
            mmu,
            live,
        }
    }

    /// Pointer to the table at `level` on the walk of `ix`, stored in `frame`.
    fn table(&self, level: Level, ix: &TableIndices, frame: PhysicalPage<Size4K>) -> *mut PageTable {
        match self.mode {
            PagingMode::Disabled(identity) => identity.ptr(frame.base()),
            // SAFETY: `Enabled` asserts the hierarchy is active with its
            // recursive slot installed, and every table above `level` is linked.
            PagingMode::Enabled => unsafe {
                self.mmu.window_table(RecursiveWindow::table(level, ix))
            },
        }
    }

    fn read(&self, level: Level, ix: &TableIndices, frame: PhysicalPage<Size4K>) -> PageEntry {
        let table = self.table(level, ix, frame);
        // SAFETY: see `table`; the reference does not outlive this statement.
        unsafe { (*table).get(ix.at(level)) }
    }

    fn write(&self, level: Level, ix: &TableIndices, frame: PhysicalPage<Size4K>, e: PageEntry) {
        let table = self.table(level, ix, frame);
        // SAFETY: see `table`; callers hold `&mut` on the controller.
        unsafe { (*table).set(ix.at(level), e) }
    }

    fn invalidate(&self, va: VirtualAddress) {
        if self.live {
            self.mmu.invalidate_page(va);
        }
    }

    /// Install the root's self-reference if it is missing.
    ///
    /// Only needed (and only possible) while the root is directly addressable.
    /// With paging enabled the slot is necessarily present already, since
    /// the window could not work otherwise.
    ///
    /// # Errors
    /// [`MapError::UnknownError`] if the slot holds something else.
    pub fn ensure_recursive_slot(&self) -> Result<(), MapError> {
        let PagingMode::Disabled(identity) = self.mode else {
            return Ok(());
        };

        let root: *mut PageTable = identity.ptr(self.root.base());
        // SAFETY: identity access covers the root frame.
        let slot = unsafe { (*root).get(TableIndex::RECURSIVE) };
        if slot.is_zero() {
            // SAFETY: as above.
            unsafe {
                (*root).set(
                    TableIndex::RECURSIVE,
                    PageEntry::encode(self.root, ArchFlags::RECURSIVE),
                );
            }
            debug!("installed recursive slot in root {}", self.root);
            return Ok(());
        }

        if slot.present() && slot.frame() == self.root {
            Ok(())
        } else {
            error!(
                "root {} slot {} holds foreign entry {:#018X}",
                self.root,
                TableIndex::RECURSIVE.as_usize(),
                slot.into_bits()
            );
            Err(MapError::UnknownError)
        }
    }

    /// Physical frame of the root as the CPU should see it.
    ///
    /// # Errors
    /// [`ActivationError::RecursiveSlotMissing`] if the window root has no
    /// self-reference, or a [`MapError`] if the slot cannot be installed.
    pub fn resolve_root(&self) -> Result<PhysicalPage<Size4K>, ActivationError> {
        match self.mode {
            PagingMode::Disabled(_) => {
                self.ensure_recursive_slot()?;
                Ok(self.root)
            }
            PagingMode::Enabled => {
                // SAFETY: `Enabled` asserts an active hierarchy.
                let root = unsafe { self.mmu.window_table(RecursiveWindow::root()) };
                // SAFETY: short-lived read through the window.
                let slot = unsafe { (*root).get(TableIndex::RECURSIVE) };
                if slot.present() {
                    Ok(slot.frame())
                } else {
                    Err(ActivationError::RecursiveSlotMissing)
                }
            }
        }
    }

    /// Read-only translation; zero for anything not mapped.
    ///
    /// A 4 KiB leaf counts as mapped whenever its entry is non-zero, so a leaf
    /// written without the present bit still translates. Huge leaves at L3 and
    /// L2 are honored by adding the in-page offset.
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> PhysicalAddress {
        let Some(ix) = TableIndices::of(va) else {
            return PhysicalAddress::zero();
        };

        let mut frame = self.root;
        for level in Level::TOP_DOWN {
            let e = self.read(level, &ix, frame);
            // Only links need the present bit.
            if level != Level::L1 && !e.present() {
                return PhysicalAddress::zero();
            }

            let is_leaf = level == Level::L1 || (level != Level::L4 && e.huge_page());
            if is_leaf {
                if e.address().is_zero() {
                    return PhysicalAddress::zero();
                }
                let offset_mask = (1_u64 << level.shift()) - 1;
                let base = e.address().as_u64() & !offset_mask;
                return PhysicalAddress::new(base | (va.as_u64() & offset_mask));
            }

            frame = e.frame();
        }

        PhysicalAddress::zero()
    }

    /// Follow (or create) the link out of the table at `level`.
    fn ensure_next<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        level: Level,
        ix: &TableIndices,
        frame: PhysicalPage<Size4K>,
    ) -> Result<PhysicalPage<Size4K>, MapError> {
        let Some(child) = level.next() else {
            return Err(MapError::UnknownError);
        };

        let e = self.read(level, ix, frame);
        if e.present() {
            if e.huge_page() {
                error!(
                    "{level:?} entry for {} is a huge leaf, cannot descend",
                    ix.to_virtual()
                );
                return Err(MapError::UnknownError);
            }
            return Ok(e.frame());
        }

        let Some(next) = alloc.alloc_4k() else {
            warn!("out of frames for {child:?} table of {}", ix.to_virtual());
            return Err(MapError::AllocFailed);
        };
        if next.base().as_u64() >= PHYSICAL_ADDRESS_LIMIT {
            warn!("allocator returned unencodable frame {next} for {child:?} table");
            return Err(MapError::AllocFailed);
        }

        self.write(level, ix, frame, PageEntry::encode(next, ArchFlags::TABLE));

        // The window address may still cache whatever was there before the link.
        self.invalidate(RecursiveWindow::table(child, ix));

        let table = self.table(child, ix, next);
        // SAFETY: the table was just linked and nothing else references it.
        unsafe { (*table).zero() };

        debug!("new {child:?} table {next} for {}", ix.to_virtual());
        Ok(next)
    }

    /// Install the leaf `va → pa`.
    ///
    /// # Errors
    /// See [`MapError`].
    pub fn map<A: FrameAlloc + ?Sized>(
        &self,
        alloc: &mut A,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageFlags,
        force_write: bool,
    ) -> Result<(), MapError> {
        let va = va.align_down::<Size4K>();
        let ix = TableIndices::of(va).ok_or(MapError::InvalidVirtualAddress)?;
        if RecursiveWindow::contains(va) {
            return Err(MapError::InvalidVirtualAddress);
        }
        let target = PhysicalPage::<Size4K>::try_from_addr(pa).ok_or(MapError::InvalidPhysicalAddress)?;
        if target.base().as_u64() >= PHYSICAL_ADDRESS_LIMIT {
            return Err(MapError::InvalidPhysicalAddress);
        }

        if !force_write && !self.translate(va).is_zero() {
            return Err(MapError::EntryExists);
        }

        self.ensure_recursive_slot()?;

        let mut frame = self.root;
        for level in Level::INTERMEDIATE {
            frame = self.ensure_next(alloc, level, &ix, frame)?;
        }

        let old = self.read(Level::L1, &ix, frame);
        if !old.is_zero() && !force_write {
            return Err(MapError::EntryExists);
        }

        self.write(Level::L1, &ix, frame, PageEntry::encode(target, ArchFlags::from(flags)));
        if !old.is_zero() {
            self.invalidate(va);
        }

        trace!("mapped {va} -> {pa} ({flags:?})");
        Ok(())
    }

    /// Clear the leaf of `va` and return the frame it pointed at.
    ///
    /// # Errors
    /// [`MapError::NotMapped`] if there is no 4 KiB leaf.
    pub fn unmap(&self, va: VirtualAddress) -> Result<PhysicalAddress, MapError> {
        let va = va.align_down::<Size4K>();
        let ix = TableIndices::of(va).ok_or(MapError::InvalidVirtualAddress)?;
        if RecursiveWindow::contains(va) {
            return Err(MapError::InvalidVirtualAddress);
        }

        let mut frame = self.root;
        for level in Level::INTERMEDIATE {
            let e = self.read(level, &ix, frame);
            if !e.present() {
                return Err(MapError::NotMapped);
            }
            if e.huge_page() {
                error!("{va} is covered by a huge {level:?} leaf");
                return Err(MapError::UnknownError);
            }
            frame = e.frame();
        }

        let old = self.read(Level::L1, &ix, frame);
        if old.is_zero() {
            return Err(MapError::NotMapped);
        }

        self.write(Level::L1, &ix, frame, PageEntry::zero());
        self.invalidate(va);

        trace!("unmapped {va} (was {})", old.address());
        Ok(old.address())
    }
}
