use crate::arch::x86_64::Mmu;
use crate::arch::x86_64::walker::Walker;
use crate::controller::{ControllerState, PagingController, PagingMode};
use crate::error::{ActivationError, MapError};
use crate::flags::PageFlags;
use crate::frame_alloc::FrameAlloc;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use log::info;

/// Paging controller for one x86-64 PML4 hierarchy.
///
/// ```rust
/// # use kernel_paginator::{ControllerState, IdentityAccess, PageFlags, PagingController, PagingMode};
/// # use kernel_paginator::arch::x86_64::{Mmu, PageTable, X86_64PagingController};
/// # use kernel_paginator::ActivationError;
/// # use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
/// struct NoMmu;
/// impl Mmu for NoMmu {
///     fn invalidate_page(&self, _: VirtualAddress) {}
///     unsafe fn load_root(&self, _: PhysicalPage<Size4K>) -> Result<(), ActivationError> {
///         Ok(())
///     }
/// }
///
/// // Host memory plays physical RAM.
/// let frames: Vec<Box<PageTable>> = (0..4).map(|_| Box::new(PageTable::zeroed())).collect();
/// let mut spare = frames[1..].iter().map(|t| PhysicalAddress::from_ptr(&**t).as_u64());
/// let root = PhysicalPage::<Size4K>::containing(PhysicalAddress::from_ptr(&*frames[0]));
///
/// let mut ctl = unsafe {
///     let mode = PagingMode::Disabled(IdentityAccess::assume());
///     X86_64PagingController::new(root, move || spare.next().unwrap_or(0), NoMmu, mode)
/// };
///
/// let va = VirtualAddress::new(0xFFFF_8000_0000_0000);
/// let pa = PhysicalAddress::new(0x20_0000);
/// ctl.map_page(va, pa, PageFlags::KERNEL_DATA, false).unwrap();
/// assert_eq!(ctl.translate(va + 0x123), pa + 0x123);
/// assert_eq!(ctl.state(), ControllerState::Building);
/// ```
pub struct X86_64PagingController<A: FrameAlloc, M: Mmu> {
    root: PhysicalPage<Size4K>,
    alloc: A,
    mmu: M,
    mode: PagingMode,
    state: ControllerState,
}

impl<A: FrameAlloc, M: Mmu> X86_64PagingController<A, M> {
    /// Take over the root table in `root`.
    ///
    /// The root is neither allocated nor cleared here.
    ///
    /// # Safety
    /// - `root` must be a zeroed (or otherwise valid) PML4 frame that this
    ///   controller exclusively modifies from now on.
    /// - In [`PagingMode::Enabled`] the hierarchy must be the active one.
    pub const unsafe fn new(root: PhysicalPage<Size4K>, alloc: A, mmu: M, mode: PagingMode) -> Self {
        Self {
            root,
            alloc,
            mmu,
            mode,
            state: ControllerState::Building,
        }
    }

    /// Physical frame of the root table.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> PhysicalPage<Size4K> {
        self.root
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> PagingMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// The hardware hooks in use.
    #[inline]
    #[must_use]
    pub const fn mmu(&self) -> &M {
        &self.mmu
    }

    /// Switch how tables are reached, typically to [`PagingMode::Enabled`]
    /// once identity access is gone after [`activate`](PagingController::activate).
    ///
    /// # Safety
    /// The new mode must describe the CPU's actual state; see [`PagingMode`].
    pub const unsafe fn set_mode(&mut self, mode: PagingMode) {
        self.mode = mode;
    }

    /// Cached translations may exist once the CPU walks this hierarchy.
    const fn is_live(&self) -> bool {
        !self.mode.is_paging_disabled() || matches!(self.state, ControllerState::Active)
    }

    fn walker(&self) -> Walker<'_, M> {
        Walker::new(self.root, self.mode, &self.mmu, self.is_live())
    }
}

impl<A: FrameAlloc, M: Mmu> PagingController for X86_64PagingController<A, M> {
    fn map_page(
        &mut self,
        virt: VirtualAddress,
        phys: PhysicalAddress,
        flags: PageFlags,
        force_write: bool,
    ) -> Result<(), MapError> {
        // Borrow the allocator apart from the walker.
        let walker = Walker::new(self.root, self.mode, &self.mmu, self.is_live());
        walker.map(&mut self.alloc, virt, phys, flags, force_write)
    }

    fn unmap_page(&mut self, virt: VirtualAddress) -> Result<PhysicalAddress, MapError> {
        self.walker().unmap(virt)
    }

    fn translate(&self, virt: VirtualAddress) -> PhysicalAddress {
        self.walker().translate(virt)
    }

    unsafe fn activate(&mut self) -> Result<(), ActivationError> {
        let root = self.walker().resolve_root()?;

        // SAFETY: forwarded to the caller.
        unsafe { self.mmu.load_root(root)? };

        self.state = ControllerState::Active;
        info!("activated page tables at {root}");
        Ok(())
    }
}
