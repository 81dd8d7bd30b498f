//! # Region mapping
//!
//! Page-by-page helpers over a [`PagingController`] for the loader's job of
//! making firmware memory reachable before the hand-off: every region of the
//! firmware memory map that is not free conventional RAM is identity-mapped,
//! then the table is activated.
//!
//! Pages that are already mapped are expected (regions may share page-table
//! coverage or be listed twice) and are counted rather than reported.

use crate::controller::PagingController;
use crate::error::MapError;
use crate::flags::PageFlags;
use crate::info::PAGE_SIZE;
use core::fmt;
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// What the firmware uses a range of physical memory for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RegionKind {
    /// Free RAM. Left unmapped; the kernel hands it out later.
    Conventional,
    /// Loader image and loader allocations, page tables included.
    Loader,
    /// Boot-services code and data.
    BootServices,
    /// Runtime-services code and data; must stay reachable after exit.
    RuntimeServices,
    /// ACPI tables and NVS.
    Acpi,
    /// Memory-mapped I/O.
    Mmio,
    /// Anything else, including unusable and persistent memory.
    Reserved,
}

impl RegionKind {
    /// Classify a UEFI `EFI_MEMORY_TYPE` value.
    #[must_use]
    pub const fn from_efi_type(ty: u32) -> Self {
        match ty {
            1 | 2 => Self::Loader,
            3 | 4 => Self::BootServices,
            5 | 6 => Self::RuntimeServices,
            7 => Self::Conventional,
            9 | 10 => Self::Acpi,
            11 | 12 => Self::Mmio,
            _ => Self::Reserved,
        }
    }

    /// Whether the loader identity-maps regions of this kind.
    #[inline]
    #[must_use]
    pub const fn needs_identity_map(self) -> bool {
        !matches!(self, Self::Conventional)
    }
}

/// One entry of the firmware memory map.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryRegion {
    pub base: PhysicalAddress,
    pub page_count: u64,
    pub kind: RegionKind,
}

/// Outcome of mapping a range.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RegionMapSummary {
    /// Pages newly mapped.
    pub mapped: u64,
    /// Pages that already had a mapping and were left as they were.
    pub already_present: u64,
}

impl RegionMapSummary {
    #[inline]
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.mapped + self.already_present
    }

    const fn merge(&mut self, other: Self) {
        self.mapped += other.mapped;
        self.already_present += other.already_present;
    }
}

impl fmt::Display for RegionMapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages mapped, {} already present",
            self.mapped, self.already_present
        )
    }
}

/// Failure while mapping a range.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionMapError {
    /// The range runs past the end of the address space.
    #[error("range of {pages} pages at {base:#018X} overflows the address space")]
    RangeOverflow { base: u64, pages: u64 },
    /// Mapping one page failed; pages before it stay mapped.
    #[error("mapping {virt} -> {phys} failed: {source}")]
    Map {
        virt: VirtualAddress,
        phys: PhysicalAddress,
        #[source]
        source: MapError,
    },
}

/// Map `pages` consecutive pages `virt → phys`.
///
/// Already-mapped pages are left untouched and counted.
///
/// # Errors
/// [`RegionMapError::RangeOverflow`] before anything is mapped, or
/// [`RegionMapError::Map`] for the first page that fails.
pub fn map_region<C: PagingController + ?Sized>(
    ctl: &mut C,
    virt: VirtualAddress,
    phys: PhysicalAddress,
    pages: u64,
    flags: PageFlags,
) -> Result<RegionMapSummary, RegionMapError> {
    let overflow = |base: u64| RegionMapError::RangeOverflow { base, pages };
    let len = pages
        .checked_mul(PAGE_SIZE)
        .ok_or_else(|| overflow(phys.as_u64()))?;
    phys.checked_add(len)
        .ok_or_else(|| overflow(phys.as_u64()))?;
    virt.checked_add(len)
        .ok_or_else(|| overflow(virt.as_u64()))?;

    let mut summary = RegionMapSummary::default();
    for i in 0..pages {
        let off = i * PAGE_SIZE;
        let (v, p) = (virt + off, phys + off);
        match ctl.map_page(v, p, flags, false) {
            Ok(()) => summary.mapped += 1,
            Err(MapError::EntryExists) => summary.already_present += 1,
            Err(source) => {
                return Err(RegionMapError::Map {
                    virt: v,
                    phys: p,
                    source,
                });
            }
        }
    }

    Ok(summary)
}

/// Identity-map `pages` pages starting at `base`.
///
/// # Errors
/// As [`map_region`].
pub fn identity_map_region<C: PagingController + ?Sized>(
    ctl: &mut C,
    base: PhysicalAddress,
    pages: u64,
    flags: PageFlags,
) -> Result<RegionMapSummary, RegionMapError> {
    map_region(ctl, VirtualAddress::new(base.as_u64()), base, pages, flags)
}

/// Identity-map every region the kernel needs reachable at hand-off, that is
/// everything except [`RegionKind::Conventional`].
///
/// # Errors
/// The first failure aborts; see [`map_region`].
pub fn identity_map_boot_regions<C, I>(
    ctl: &mut C,
    regions: I,
    flags: PageFlags,
) -> Result<RegionMapSummary, RegionMapError>
where
    C: PagingController + ?Sized,
    I: IntoIterator<Item = MemoryRegion>,
{
    let mut summary = RegionMapSummary::default();
    for region in regions {
        if !region.kind.needs_identity_map() {
            continue;
        }
        log::trace!(
            "identity mapping {:?} region at {} ({} pages)",
            region.kind,
            region.base,
            region.page_count
        );
        summary.merge(identity_map_region(ctl, region.base, region.page_count, flags)?);
    }

    log::debug!("boot regions: {summary}");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActivationError;
    use std::collections::BTreeMap;

    /// Controller double: records leaves, fails after `budget` new mappings.
    #[derive(Default)]
    struct Recorder {
        leaves: BTreeMap<u64, (u64, PageFlags)>,
        budget: Option<usize>,
    }

    impl PagingController for Recorder {
        fn map_page(
            &mut self,
            virt: VirtualAddress,
            phys: PhysicalAddress,
            flags: PageFlags,
            force_write: bool,
        ) -> Result<(), MapError> {
            if !force_write && self.leaves.contains_key(&virt.as_u64()) {
                return Err(MapError::EntryExists);
            }
            if let Some(budget) = self.budget.as_mut() {
                if *budget == 0 {
                    return Err(MapError::AllocFailed);
                }
                *budget -= 1;
            }
            self.leaves.insert(virt.as_u64(), (phys.as_u64(), flags));
            Ok(())
        }

        fn unmap_page(&mut self, virt: VirtualAddress) -> Result<PhysicalAddress, MapError> {
            self.leaves
                .remove(&virt.as_u64())
                .map(|(p, _)| PhysicalAddress::new(p))
                .ok_or(MapError::NotMapped)
        }

        fn translate(&self, virt: VirtualAddress) -> PhysicalAddress {
            let page = virt.as_u64() & !0xFFF;
            self.leaves.get(&page).map_or(PhysicalAddress::zero(), |(p, _)| {
                PhysicalAddress::new(p + virt.page_offset())
            })
        }

        unsafe fn activate(&mut self) -> Result<(), ActivationError> {
            Ok(())
        }
    }

    fn region(base: u64, page_count: u64, kind: RegionKind) -> MemoryRegion {
        MemoryRegion {
            base: PhysicalAddress::new(base),
            page_count,
            kind,
        }
    }

    #[test]
    fn identity_region_maps_every_page_onto_itself() {
        let mut ctl = Recorder::default();
        let summary =
            identity_map_region(&mut ctl, PhysicalAddress::new(0x10_0000), 3, PageFlags::BOOT_IDENTITY)
                .unwrap();

        assert_eq!(summary, RegionMapSummary { mapped: 3, already_present: 0 });
        for va in [0x10_0000, 0x10_1000, 0x10_2000] {
            assert_eq!(ctl.translate(VirtualAddress::new(va)).as_u64(), va);
        }
        assert_eq!(ctl.translate(VirtualAddress::new(0x10_3000)).as_u64(), 0);
    }

    #[test]
    fn overlapping_regions_are_counted_not_failed() {
        let mut ctl = Recorder::default();
        let regions = [
            region(0x1000, 4, RegionKind::Loader),
            region(0x3000, 4, RegionKind::BootServices),
        ];
        let summary =
            identity_map_boot_regions(&mut ctl, regions, PageFlags::BOOT_IDENTITY).unwrap();

        assert_eq!(summary.mapped, 6);
        assert_eq!(summary.already_present, 2);
        assert_eq!(summary.total(), 8);
    }

    #[test]
    fn conventional_memory_is_skipped() {
        let mut ctl = Recorder::default();
        let regions = [
            region(0x1000, 1, RegionKind::Acpi),
            region(0x10_0000, 256, RegionKind::Conventional),
            region(0xFEE0_0000, 1, RegionKind::Mmio),
        ];
        let summary =
            identity_map_boot_regions(&mut ctl, regions, PageFlags::BOOT_IDENTITY).unwrap();

        assert_eq!(summary.mapped, 2);
        assert!(ctl.leaves.contains_key(&0x1000));
        assert!(ctl.leaves.contains_key(&0xFEE0_0000));
        assert!(!ctl.leaves.contains_key(&0x10_0000));
    }

    #[test]
    fn linear_region_keeps_the_offset() {
        let mut ctl = Recorder::default();
        map_region(
            &mut ctl,
            VirtualAddress::new(0xFFFF_8000_0000_0000),
            PhysicalAddress::new(0x20_0000),
            2,
            PageFlags::KERNEL_DATA,
        )
        .unwrap();

        let va = VirtualAddress::new(0xFFFF_8000_0000_1234);
        assert_eq!(ctl.translate(va).as_u64(), 0x20_1234);
        assert_eq!(ctl.leaves[&0xFFFF_8000_0000_1000].1, PageFlags::KERNEL_DATA);
    }

    #[test]
    fn first_failure_aborts_and_reports_the_page() {
        let mut ctl = Recorder {
            budget: Some(2),
            ..Recorder::default()
        };
        let err = identity_map_region(&mut ctl, PhysicalAddress::new(0x5000), 4, PageFlags::BOOT_IDENTITY)
            .unwrap_err();

        assert_eq!(
            err,
            RegionMapError::Map {
                virt: VirtualAddress::new(0x7000),
                phys: PhysicalAddress::new(0x7000),
                source: MapError::AllocFailed,
            }
        );
        assert_eq!(ctl.leaves.len(), 2);
    }

    #[test]
    fn wrapping_range_is_rejected_up_front() {
        let mut ctl = Recorder::default();
        let err = identity_map_region(
            &mut ctl,
            PhysicalAddress::new(0xFFFF_FFFF_FFFF_0000),
            0x100,
            PageFlags::BOOT_IDENTITY,
        )
        .unwrap_err();

        assert!(matches!(err, RegionMapError::RangeOverflow { pages: 0x100, .. }));
        assert!(ctl.leaves.is_empty());
    }

    #[test]
    fn efi_memory_types() {
        assert_eq!(RegionKind::from_efi_type(7), RegionKind::Conventional);
        assert_eq!(RegionKind::from_efi_type(2), RegionKind::Loader);
        assert_eq!(RegionKind::from_efi_type(6), RegionKind::RuntimeServices);
        assert_eq!(RegionKind::from_efi_type(11), RegionKind::Mmio);
        assert_eq!(RegionKind::from_efi_type(0), RegionKind::Reserved);
        assert!(!RegionKind::Conventional.needs_identity_map());
        assert!(RegionKind::Reserved.needs_identity_map());
    }
}
