use crate::arch::x86_64::ArchFlags;
use crate::info::{PAGE_SIZE, PHYSICAL_ADDRESS_LIMIT};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Bits 12..=51 of an entry: the frame address.
///
/// Bits 52..=62 are OS/PKU bits and bit 63 is NX; none of them belong to the
/// address.
pub const ADDRESS_MASK: u64 = 0x000F_FFFF_FFFF_F000;

const _: () = assert!(ADDRESS_MASK == (PHYSICAL_ADDRESS_LIMIT - 1) & !(PAGE_SIZE - 1));

/// A single 64-bit x86-64 paging entry in its raw bitfield form.
///
/// Every level (PML4E, PDPTE, PDE, PTE) shares this layout. Whether an entry
/// points to a table or maps a frame follows from its level, not from a tag.
/// An all-zero entry is "absent".
///
/// ### Bit layout
///
/// | Bits   | Name              | Meaning |
/// |--------|-------------------|---------|
/// | 0      | `P`               | Present |
/// | 1      | `RW`              | Writable |
/// | 2      | `US`              | User accessible |
/// | 3      | `PWT`             | Write-through |
/// | 4      | `PCD`             | Cache disable |
/// | 5      | `A`               | Accessed |
/// | 6      | `D`               | Dirty (leaf only) |
/// | 7      | `PS`              | Huge page (L3/L2) / PAT (L1) |
/// | 8      | `G`               | Global (leaf only) |
/// | 9–11   | OS avail low      | Ignored by hardware |
/// | 12–51  | `addr`            | Frame bits [51:12] |
/// | 52–58  | OS avail high     | Ignored by hardware |
/// | 59–62  | `PKU`             | Protection key / OS use |
/// | 63     | `NX`              | Execute disable |
///
/// ### Example
/// ```rust
/// # use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
/// # use kernel_paginator::arch::x86_64::{ArchFlags, PageEntry};
/// let frame = PhysicalPage::<Size4K>::containing(PhysicalAddress::new(0x12_3000));
/// let e = PageEntry::encode(frame, ArchFlags::PRESENT | ArchFlags::NO_EXECUTE);
/// assert!(e.present() && e.no_execute());
/// assert_eq!(e.address().as_u64(), 0x12_3000);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageEntry {
    pub present: bool,
    pub writable: bool,
    pub user_access: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    pub accessed: bool,
    pub dirty: bool,
    pub huge_page: bool,
    pub global: bool,
    #[bits(3)]
    pub os_available_low: u8,
    /// Physical address bits [51:12].
    #[bits(40)]
    frame_bits_51_12: u64,
    #[bits(7)]
    pub os_available_high: u8,
    #[bits(4)]
    pub protection_key: u8,
    pub no_execute: bool,
}

impl PageEntry {
    /// The absent entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// Pack a frame and its flags into an entry.
    ///
    /// The frame type guarantees 4 KiB alignment, so the address never
    /// bleeds into the low flag bits. Frames at or above
    /// [`PHYSICAL_ADDRESS_LIMIT`] must be refused before they get here.
    #[inline]
    #[must_use]
    pub const fn encode(frame: PhysicalPage<Size4K>, flags: ArchFlags) -> Self {
        let addr = frame.base().as_u64();
        debug_assert!(addr & !ADDRESS_MASK == 0, "frame beyond 52-bit physical space");
        Self::from_bits(flags.bits() | (addr & ADDRESS_MASK))
    }

    /// Unpack the frame address (bits 12..=51).
    #[inline]
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_bits_51_12() << 12)
    }

    /// The frame this entry points at, table or leaf.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalPage<Size4K> {
        PhysicalPage::containing(self.address())
    }

    /// Unpack the flag bits (everything except the address).
    #[inline]
    #[must_use]
    pub const fn flags(self) -> ArchFlags {
        ArchFlags::from_bits_truncate(self.into_bits() & !ADDRESS_MASK)
    }

    /// `true` for a slot never written (or cleared).
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.into_bits() == 0
    }
}
