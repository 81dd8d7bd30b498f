//! # TLB maintenance
//!
//! After a present leaf entry of the **active** hierarchy is overwritten or
//! cleared, the CPU may still hold the old translation. `invlpg` drops it for
//! one address on the executing core.

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
use kernel_memory_addresses::VirtualAddress;

/// Invalidate the cached translation of `va` on this CPU.
///
/// # Safety
/// Must run at CPL0.
#[cfg(all(feature = "asm", target_arch = "x86_64"))]
#[inline]
pub unsafe fn invalidate_page(va: VirtualAddress) {
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u64(), options(nostack, preserves_flags));
    }
}
