//! # Paging Layout
//!
//! Fixed numbers of the 4-level x86-64 layout and of the recursive window.

use kernel_memory_addresses::{PageSize, Size4K};

/// Entries per table at every level.
pub const ENTRIES_PER_TABLE: usize = 512;

/// Bytes per table (one 4 KiB frame).
pub const PAGE_TABLE_SIZE: u64 = 4096;

/// Size of a regular leaf page.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// First physical address an entry cannot encode (52-bit physical space).
pub const PHYSICAL_ADDRESS_LIMIT: u64 = 1 << 52;

/// Mask of one 9-bit table index.
pub const INDEX_MASK: u64 = 0x1FF;

/// Virtual address shifts of the L4 / L3 / L2 / L1 indices.
pub const P4_SHIFT: u32 = 39;
pub const P3_SHIFT: u32 = 30;
pub const P2_SHIFT: u32 = 21;
pub const P1_SHIFT: u32 = 12;

/// Root slot that points back at the root table itself.
///
/// Once the hierarchy is active, every table is reachable at a fixed
/// virtual address inside the 512 GiB window selected by this L4 slot.
/// Addresses inside the window cannot be mapped by callers.
pub const RECURSIVE_INDEX: usize = 1;

/// First address of the recursive window.
pub const RECURSIVE_WINDOW_BASE: u64 = (RECURSIVE_INDEX as u64) << P4_SHIFT;

/// One past the last address of the recursive window.
pub const RECURSIVE_WINDOW_END: u64 = RECURSIVE_WINDOW_BASE + (1 << P4_SHIFT);

const _: () = {
    assert!(PAGE_TABLE_SIZE == PAGE_SIZE);
    assert!(ENTRIES_PER_TABLE as u64 * 8 == PAGE_TABLE_SIZE);
    assert!(RECURSIVE_INDEX < ENTRIES_PER_TABLE);
    // The window sits in the lower canonical half; no sign extension needed.
    assert!(RECURSIVE_INDEX < ENTRIES_PER_TABLE / 2);
};
