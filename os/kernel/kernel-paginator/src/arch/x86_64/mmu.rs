//! # CPU hooks used by the controller
//!
//! Three things the paging engine cannot do in plain Rust: drop a cached
//! translation, load CR3, and dereference a recursive-window address. They
//! are grouped behind [`Mmu`] so the loader, the kernel and the host tests can
//! each supply their own.

use crate::ActivationError;
use crate::arch::x86_64::PageTable;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};

/// The hardware side of address translation.
pub trait Mmu {
    /// Drop any cached translation of `va` on the executing CPU.
    fn invalidate_page(&self, va: VirtualAddress);

    /// Make `root` the active PML4.
    ///
    /// # Errors
    /// If the root cannot be loaded. Callers treat this as fatal.
    ///
    /// # Safety
    /// Every instruction and datum the caller touches afterwards must be
    /// mapped by the new hierarchy.
    unsafe fn load_root(&self, root: PhysicalPage<Size4K>) -> Result<(), ActivationError>;

    /// Turn a recursive-window address into a table pointer.
    ///
    /// With real hardware the window address *is* the pointer; the CPU walks
    /// through the recursive slot on access.
    ///
    /// # Safety
    /// Only valid while a hierarchy with an installed recursive slot is active.
    unsafe fn window_table(&self, va: VirtualAddress) -> *mut PageTable {
        va.as_u64() as *mut PageTable
    }
}

/// The executing x86-64 CPU.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct X86Mmu {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl X86Mmu {
    /// # Safety
    /// Must only be used at CPL0; `invlpg` and `mov cr3` are privileged.
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl Mmu for X86Mmu {
    #[inline]
    fn invalidate_page(&self, va: VirtualAddress) {
        // SAFETY: the constructor established CPL0.
        unsafe { kernel_registers::tlb::invalidate_page(va) }
    }

    unsafe fn load_root(&self, root: PhysicalPage<Size4K>) -> Result<(), ActivationError> {
        use kernel_registers::cr3::Cr3;
        use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

        if root.base().is_zero() {
            return Err(ActivationError::InvalidRoot(root.base()));
        }

        // Keep PWT/PCD as the firmware configured them.
        unsafe {
            let cr3 = Cr3::load_unsafe().with_pml4_phys(root.base());
            cr3.store_unsafe();
        }
        Ok(())
    }
}
