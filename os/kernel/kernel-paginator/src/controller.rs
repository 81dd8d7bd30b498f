//! # Paging controller interface
//!
//! A paging controller owns one page-table hierarchy and is the only way to
//! change it. Exactly one implementation is compiled per target architecture
//! (see [`arch`](crate::arch)); loader and kernel code program against
//! [`PagingController`].
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──► Building ──activate──► Active
//!            │  ▲                    │
//!            └──┘ map/unmap          └── map/unmap take effect immediately
//! ```
//!
//! Activation does **not** change the [`PagingMode`]. A loader that keeps
//! using the controller after switching CR3 must call
//! [`set_mode`](crate::arch::x86_64::X86_64PagingController::set_mode)
//! itself once direct physical access is no longer valid.

use crate::error::{ActivationError, MapError};
use crate::flags::PageFlags;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Map / unmap / translate / activate over one hierarchy.
pub trait PagingController {
    /// Map the 4 KiB page at `virt` to the frame at `phys`.
    ///
    /// Missing intermediate tables are allocated on the way. With
    /// `force_write` an existing mapping is replaced (and its cached
    /// translation dropped); without it an existing mapping is an error.
    ///
    /// # Errors
    /// See [`MapError`]; on error no leaf has been written.
    fn map_page(
        &mut self,
        virt: VirtualAddress,
        phys: PhysicalAddress,
        flags: PageFlags,
        force_write: bool,
    ) -> Result<(), MapError>;

    /// Map the page at `addr` onto itself.
    ///
    /// # Errors
    /// As [`map_page`](Self::map_page); addresses above the lower canonical
    /// half are not valid virtual addresses.
    fn identity_map_page(
        &mut self,
        addr: PhysicalAddress,
        flags: PageFlags,
        force_write: bool,
    ) -> Result<(), MapError> {
        self.map_page(VirtualAddress::new(addr.as_u64()), addr, flags, force_write)
    }

    /// Remove the leaf for `virt` and return the frame it pointed at.
    ///
    /// Intermediate tables are kept, even when they become empty.
    ///
    /// # Errors
    /// [`MapError::NotMapped`] if there is no leaf, or
    /// [`MapError::InvalidVirtualAddress`].
    fn unmap_page(&mut self, virt: VirtualAddress) -> Result<PhysicalAddress, MapError>;

    /// Physical address `virt` translates to, or zero if unmapped.
    ///
    /// A page mapped to frame zero also reads as zero.
    fn translate(&self, virt: VirtualAddress) -> PhysicalAddress;

    /// Load the hierarchy into the CPU.
    ///
    /// # Errors
    /// If the root cannot be resolved or loaded. There is no rollback.
    ///
    /// # Safety
    /// The code, stack and data in use by the caller must be mapped.
    unsafe fn activate(&mut self) -> Result<(), ActivationError>;
}

/// Capability to dereference physical addresses as pointers.
///
/// Holds while translation is off, or while the hierarchy in use identity-maps
/// every frame this controller touches (as UEFI firmware does for a loader).
#[derive(Copy, Clone, Debug)]
pub struct IdentityAccess {
    _private: (),
}

impl IdentityAccess {
    /// # Safety
    /// Every page-table frame reachable by the controller, and every frame
    /// the allocator hands out, must be readable and writable at the virtual
    /// address equal to its physical address for as long as the token is used.
    #[must_use]
    pub const unsafe fn assume() -> Self {
        Self { _private: () }
    }

    /// Pointer to the `T` at `pa`.
    #[inline]
    #[must_use]
    pub const fn ptr<T>(self, pa: PhysicalAddress) -> *mut T {
        pa.as_u64() as *mut T
    }
}

/// How the controller reaches its tables.
#[derive(Copy, Clone, Debug)]
pub enum PagingMode {
    /// Physical addresses are dereferenced directly.
    Disabled(IdentityAccess),
    /// Tables are reached through the recursive window of the active hierarchy.
    Enabled,
}

impl PagingMode {
    #[inline]
    #[must_use]
    pub const fn is_paging_disabled(&self) -> bool {
        matches!(self, Self::Disabled(_))
    }
}

/// Observable state of a controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerState {
    /// The hierarchy is not loaded in CR3.
    Building,
    /// [`PagingController::activate`] succeeded.
    Active,
}
