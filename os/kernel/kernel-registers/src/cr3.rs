use bitfield_struct::bitfield;
use kernel_memory_addresses::PhysicalAddress;

/// CR3: Page-Map Level-4 Base Register (IA-32e, PCID disabled).
///
/// Holds the physical base address of the PML4 table and cache-control flags
/// for PML4 walks. Assumes standard 4 KiB alignment and no PCID (CR4.PCIDE = 0).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Cr3 {
    /// Bits 0–2: Reserved (must be 0).
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3: PWT: Page-level Write-Through for PML4.
    pub pwt: bool,

    /// Bit 4: PCD: Page-level Cache Disable for PML4.
    pub pcd: bool,

    /// Bits 5–11: Reserved (must be 0 when written).
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–51: PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63: Reserved.
    #[bits(12)]
    pub reserved2: u16,
}

impl Cr3 {
    /// Create a `Cr3` value from a PML4 physical base address and flags.
    ///
    /// `pml4_phys` must be 4 KiB-aligned.
    #[must_use]
    pub fn from_pml4_phys(pml4_phys: PhysicalAddress, pwt: bool, pcd: bool) -> Self {
        debug_assert_eq!(
            pml4_phys.as_u64() & 0xFFF,
            0,
            "PML4 base must be 4K-aligned"
        );
        Self::new()
            .with_pwt(pwt)
            .with_pcd(pcd)
            .with_pml4_base_4k(pml4_phys.as_u64() >> 12)
    }

    /// Replace the PML4 base while keeping the cache-control bits.
    ///
    /// Used when switching roots: the PWT/PCD policy already present in the
    /// hardware register is carried over to the new table.
    #[must_use]
    pub fn with_pml4_phys(self, pml4_phys: PhysicalAddress) -> Self {
        Self::from_pml4_phys(pml4_phys, self.pwt(), self.pcd())
    }

    /// Return the full physical address of the PML4 base.
    #[must_use]
    pub fn pml4_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.pml4_base_4k() << 12)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
impl crate::StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_roundtrips_and_keeps_cache_bits() {
        let cr3 = Cr3::from_pml4_phys(PhysicalAddress::new(0x0012_3000), true, false);
        assert_eq!(cr3.pml4_phys().as_u64(), 0x0012_3000);
        assert!(cr3.pwt());
        assert!(!cr3.pcd());
        assert_eq!(cr3.into_bits(), 0x0012_3000 | (1 << 3));

        let moved = cr3.with_pml4_phys(PhysicalAddress::new(0x0045_6000));
        assert_eq!(moved.pml4_phys().as_u64(), 0x0045_6000);
        assert!(moved.pwt());
    }
}
