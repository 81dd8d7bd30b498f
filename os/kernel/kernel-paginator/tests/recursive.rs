mod support;

use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};
use kernel_paginator::arch::x86_64::{
    ArchFlags, Level, Mmu, PageEntry, PageTable, RecursiveWindow, TableIndex, TableIndices,
    X86_64PagingController,
};
use kernel_paginator::{
    ActivationError, ControllerState, IdentityAccess, MapError, MemoryRegion, PageFlags,
    PagingController, PagingMode, RegionKind, identity_map_boot_regions,
};
use support::{HostController, HostRam, entry, identity_controller, pa, table, va};

const KERNEL_BASE: u64 = 0xFFFF_8000_0010_0000;
const HEAP_BASE: u64 = 0xFFFF_C000_0000_5000;

/// Build in identity mode, activate, then continue through the window.
fn live_controller(ram: &HostRam) -> HostController {
    let mut ctl = identity_controller(ram);
    ctl.map_page(va(KERNEL_BASE), pa(0x20_0000), PageFlags::KERNEL_CODE, false)
        .unwrap();
    unsafe {
        ctl.activate().unwrap();
        ctl.set_mode(PagingMode::Enabled);
    }
    ctl
}

#[test]
fn activation_loads_the_root() {
    let ram = HostRam::new();
    let mut ctl = identity_controller(&ram);
    assert_eq!(ctl.state(), ControllerState::Building);

    unsafe { ctl.activate() }.unwrap();

    assert_eq!(ctl.state(), ControllerState::Active);
    assert_eq!(ctl.mmu().loaded_root(), Some(ctl.root()));
    assert!(ctl.mode().is_paging_disabled(), "activation keeps the mode");
    let slot = table(ctl.root()).get(TableIndex::RECURSIVE);
    assert_eq!(slot.frame(), ctl.root());
}

#[test]
fn changes_after_activation_drop_cached_translations() {
    let ram = HostRam::new();
    let mut ctl = identity_controller(&ram);
    ctl.map_page(va(KERNEL_BASE), pa(0x20_0000), PageFlags::KERNEL_DATA, false)
        .unwrap();
    unsafe { ctl.activate() }.unwrap();

    ctl.map_page(va(KERNEL_BASE), pa(0x30_0000), PageFlags::KERNEL_DATA, true)
        .unwrap();
    assert!(ctl.mmu().was_invalidated(KERNEL_BASE));

    ctl.unmap_page(va(KERNEL_BASE + 0x1000)).unwrap_err();
    ctl.unmap_page(va(KERNEL_BASE)).unwrap();
    let hits = ctl
        .mmu()
        .invalidated()
        .iter()
        .filter(|v| v.as_u64() == KERNEL_BASE)
        .count();
    assert_eq!(hits, 2);
}

#[test]
fn fresh_mappings_need_no_invalidation() {
    let ram = HostRam::new();
    let mut ctl = live_controller(&ram);
    ctl.map_page(va(KERNEL_BASE + 0x1000), pa(0x20_1000), PageFlags::KERNEL_CODE, false)
        .unwrap();

    assert!(!ctl.mmu().was_invalidated(KERNEL_BASE + 0x1000));
}

#[test]
fn window_mode_sees_what_identity_mode_built() {
    let ram = HostRam::new();
    let ctl = live_controller(&ram);

    assert_eq!(ctl.translate(va(KERNEL_BASE + 0x42)), pa(0x20_0042));
    assert!(ctl.translate(va(HEAP_BASE)).is_zero());
    assert!(ctl.translate(va(KERNEL_BASE + 0x1000)).is_zero());
}

#[test]
fn window_mode_allocates_missing_tables() {
    let ram = HostRam::new().garbage();
    let mut ctl = live_controller(&ram);
    let before = ram.allocated();

    ctl.map_page(va(HEAP_BASE), pa(0x80_0000), PageFlags::KERNEL_DATA, false)
        .unwrap();

    assert_eq!(ram.allocated(), before + 3);
    assert_eq!(ctl.translate(va(HEAP_BASE + 8)), pa(0x80_0008));

    // The same leaf is visible to a plain physical walk.
    let leaf = entry(ctl.root(), HEAP_BASE, Level::L1).unwrap();
    assert_eq!(leaf.address(), pa(0x80_0000));
    assert!(leaf.no_execute());

    // Every new table was cleared through its window address.
    let l1 = entry(ctl.root(), HEAP_BASE, Level::L2).unwrap().frame();
    assert_eq!(table(l1).iter_used().count(), 1);

    let ix = TableIndices::of(va(HEAP_BASE)).unwrap();
    for level in [Level::L3, Level::L2, Level::L1] {
        let window = RecursiveWindow::table(level, &ix);
        assert!(ctl.mmu().was_invalidated(window.as_u64()), "{level:?}");
    }
}

#[test]
fn window_mode_guards_and_unmaps() {
    let ram = HostRam::new();
    let mut ctl = live_controller(&ram);

    let err = ctl
        .map_page(va(KERNEL_BASE), pa(0x90_0000), PageFlags::KERNEL_DATA, false)
        .unwrap_err();
    assert_eq!(err, MapError::EntryExists);

    assert_eq!(ctl.unmap_page(va(KERNEL_BASE)), Ok(pa(0x20_0000)));
    assert!(ctl.translate(va(KERNEL_BASE)).is_zero());
    assert!(ctl.mmu().was_invalidated(KERNEL_BASE));
}

#[test]
fn window_mode_activation_finds_the_root_through_the_slot() {
    let ram = HostRam::new();
    let mut ctl = live_controller(&ram);

    unsafe { ctl.activate() }.unwrap();

    assert_eq!(ctl.mmu().loaded_root(), Some(ctl.root()));
}

/// Serves one fixed table for every window address.
struct FixedWindow {
    table: *mut PageTable,
    accept: bool,
}

impl Mmu for FixedWindow {
    fn invalidate_page(&self, _: VirtualAddress) {}

    unsafe fn load_root(&self, root: PhysicalPage<Size4K>) -> Result<(), ActivationError> {
        if self.accept {
            Ok(())
        } else {
            Err(ActivationError::InvalidRoot(root.base()))
        }
    }

    unsafe fn window_table(&self, _: VirtualAddress) -> *mut PageTable {
        self.table
    }
}

fn fixed_window_controller(
    ram: &HostRam,
    accept: bool,
) -> X86_64PagingController<HostRam, FixedWindow> {
    let root = ram.root();
    let mmu = FixedWindow {
        table: root.base().as_u64() as *mut PageTable,
        accept,
    };
    unsafe { X86_64PagingController::new(root, ram.clone(), mmu, PagingMode::Enabled) }
}

#[test]
fn missing_self_reference_cannot_be_activated() {
    let ram = HostRam::new();
    let mut ctl = fixed_window_controller(&ram, true);

    let err = unsafe { ctl.activate() }.unwrap_err();

    assert_eq!(err, ActivationError::RecursiveSlotMissing);
    assert_eq!(ctl.state(), ControllerState::Building);
}

#[test]
fn rejected_root_is_reported() {
    let ram = HostRam::new();
    let mut ctl = fixed_window_controller(&ram, false);
    let root = ctl.root();
    table(root).set(
        TableIndex::RECURSIVE,
        PageEntry::encode(root, ArchFlags::RECURSIVE),
    );

    let err = unsafe { ctl.activate() }.unwrap_err();

    assert_eq!(err, ActivationError::InvalidRoot(root.base()));
    assert_eq!(ctl.state(), ControllerState::Building);
}

#[test]
fn identity_mode_with_foreign_slot_cannot_be_activated() {
    let ram = HostRam::new();
    let mut ctl = identity_controller(&ram);
    table(ctl.root()).set(
        TableIndex::RECURSIVE,
        PageEntry::encode(ram.root(), ArchFlags::TABLE),
    );

    let err = unsafe { ctl.activate() }.unwrap_err();
    assert_eq!(err, ActivationError::Map(MapError::UnknownError));
    assert_eq!(ctl.mmu().loaded_root(), None);
}

#[test]
fn loader_flow_identity_maps_firmware_regions() {
    let ram = HostRam::new();
    let mut ctl = identity_controller(&ram);
    let regions = [
        MemoryRegion {
            base: pa(0x0),
            page_count: 1,
            kind: RegionKind::from_efi_type(0),
        },
        MemoryRegion {
            base: pa(0x1000),
            page_count: 0x9F,
            kind: RegionKind::Conventional,
        },
        MemoryRegion {
            base: pa(0x10_0000),
            page_count: 16,
            kind: RegionKind::Loader,
        },
        MemoryRegion {
            base: pa(0x10_8000),
            page_count: 16,
            kind: RegionKind::BootServices,
        },
    ];

    let summary = identity_map_boot_regions(&mut ctl, regions, PageFlags::BOOT_IDENTITY).unwrap();
    assert_eq!(summary.mapped, 1 + 16 + 8);
    assert_eq!(summary.already_present, 8);

    unsafe { ctl.activate() }.unwrap();

    assert_eq!(ctl.translate(va(0x10_F123)), pa(0x10_F123));
    assert_eq!(ctl.translate(va(0x11_7000)), pa(0x11_7000));
    assert!(ctl.translate(va(0x5000)).is_zero());
    assert!(ctl.translate(va(0x11_8000)).is_zero());

    let again = identity_map_boot_regions(&mut ctl, regions, PageFlags::BOOT_IDENTITY).unwrap();
    assert_eq!(again.mapped, 0);
    assert_eq!(again.total(), summary.total());
}
