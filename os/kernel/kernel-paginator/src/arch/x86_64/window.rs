//! # Recursive window
//!
//! The root's slot [`RECURSIVE_INDEX`] points back at the root. Once the
//! hierarchy is active, the CPU itself resolves page tables when a virtual
//! address routes through that slot: each pass through the slot "consumes"
//! one level, so the remaining indices select a table instead of a page.
//!
//! ```text
//!            L4 slot   L3 slot   L2 slot   L1 slot
//! root     [   R    |    R    |    R    |    R    ]
//! L3 of a  [   R    |    R    |    R    |    a    ]
//! L2 of ab [   R    |    R    |    a    |    b    ]
//! L1 of abc[   R    |    a    |    b    |    c    ]
//! ```
//!
//! With `R = 1` the window spans `0x0000_0080_0000_0000..0x0000_0100_0000_0000`,
//! inside the lower canonical half, so no sign extension is set.

use crate::arch::x86_64::{Level, TableIndices};
use crate::info::{RECURSIVE_INDEX, RECURSIVE_WINDOW_BASE, RECURSIVE_WINDOW_END};
use kernel_memory_addresses::VirtualAddress;

/// Address arithmetic of the recursive window.
pub struct RecursiveWindow;

impl RecursiveWindow {
    const R: u64 = RECURSIVE_INDEX as u64;

    /// Virtual address of the root table itself.
    #[must_use]
    pub const fn root() -> VirtualAddress {
        Self::slots([Self::R, Self::R, Self::R, Self::R])
    }

    /// Virtual address of the table at `level` on the walk of `indices`.
    ///
    /// Only the indices of the levels above `level` are used.
    #[must_use]
    pub const fn table(level: Level, indices: &TableIndices) -> VirtualAddress {
        let i4 = indices.at(Level::L4).as_u64();
        let i3 = indices.at(Level::L3).as_u64();
        let i2 = indices.at(Level::L2).as_u64();
        match level {
            Level::L4 => Self::root(),
            Level::L3 => Self::slots([Self::R, Self::R, Self::R, i4]),
            Level::L2 => Self::slots([Self::R, Self::R, i4, i3]),
            Level::L1 => Self::slots([Self::R, i4, i3, i2]),
        }
    }

    /// `true` if `va` lies inside the window (its L4 index is the recursive slot).
    #[must_use]
    pub const fn contains(va: VirtualAddress) -> bool {
        let raw = va.as_u64();
        raw >= RECURSIVE_WINDOW_BASE && raw < RECURSIVE_WINDOW_END
    }

    const fn slots(slots: [u64; 4]) -> VirtualAddress {
        match TableIndices::from_raw(slots[0], slots[1], slots[2], slots[3]) {
            Some(indices) => indices.to_virtual(),
            None => panic!("table index out of range"),
        }
    }
}
