//! # Page tables and table indices
//!
//! All four levels share one table shape: 512 entries in a 4 KiB frame.

use crate::arch::x86_64::PageEntry;
use crate::info::{
    ENTRIES_PER_TABLE, INDEX_MASK, P1_SHIFT, P2_SHIFT, P3_SHIFT, P4_SHIFT, RECURSIVE_INDEX,
};
use kernel_memory_addresses::VirtualAddress;

/// Paging level, top (L4, the root) to bottom (L1, the leaves).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Level {
    L4,
    L3,
    L2,
    L1,
}

impl Level {
    /// Levels in walk order.
    pub const TOP_DOWN: [Self; 4] = [Self::L4, Self::L3, Self::L2, Self::L1];

    /// Levels whose entries point at another table.
    pub const INTERMEDIATE: [Self; 3] = [Self::L4, Self::L3, Self::L2];

    /// Bit position of this level's index inside a virtual address.
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        match self {
            Self::L4 => P4_SHIFT,
            Self::L3 => P3_SHIFT,
            Self::L2 => P2_SHIFT,
            Self::L1 => P1_SHIFT,
        }
    }

    /// Number of levels above this one.
    #[inline]
    #[must_use]
    pub const fn depth(self) -> usize {
        self as usize
    }

    /// The level below, `None` at L1.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::L4 => Some(Self::L3),
            Self::L3 => Some(Self::L2),
            Self::L2 => Some(Self::L1),
            Self::L1 => None,
        }
    }
}

/// Index into one table (`0..512`).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl TableIndex {
    /// The root slot that points back at the root.
    #[allow(clippy::cast_possible_truncation)]
    pub const RECURSIVE: Self = Self(RECURSIVE_INDEX as u16);

    /// Construct from a raw value; `None` if it does not fit 9 bits.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(v: u64) -> Option<Self> {
        if v > INDEX_MASK {
            return None;
        }
        Some(Self(v as u16))
    }

    /// Extract the index of `level` from `va`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(va: VirtualAddress, level: Level) -> Self {
        Self(((va.as_u64() >> level.shift()) & INDEX_MASK) as u16)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }
}

/// The four indices of a canonical virtual address, L4 first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableIndices([TableIndex; 4]);

impl TableIndices {
    /// Decompose `va`, or `None` if it is not canonical.
    #[must_use]
    pub const fn of(va: VirtualAddress) -> Option<Self> {
        if !va.is_canonical() {
            return None;
        }
        Some(Self([
            TableIndex::of(va, Level::L4),
            TableIndex::of(va, Level::L3),
            TableIndex::of(va, Level::L2),
            TableIndex::of(va, Level::L1),
        ]))
    }

    /// Build from four raw indices; `None` if any exceeds 9 bits.
    #[must_use]
    pub const fn from_raw(l4: u64, l3: u64, l2: u64, l1: u64) -> Option<Self> {
        match (
            TableIndex::new(l4),
            TableIndex::new(l3),
            TableIndex::new(l2),
            TableIndex::new(l1),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => Some(Self([a, b, c, d])),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn at(&self, level: Level) -> TableIndex {
        self.0[level.depth()]
    }

    /// The canonical, page-aligned address these indices select.
    #[must_use]
    pub const fn to_virtual(&self) -> VirtualAddress {
        let raw = (self.0[0].as_u64() << P4_SHIFT)
            | (self.0[1].as_u64() << P3_SHIFT)
            | (self.0[2].as_u64() << P2_SHIFT)
            | (self.0[3].as_u64() << P1_SHIFT);
        VirtualAddress::new(raw).canonicalize()
    }
}

/// One paging table: 512 entries, 4 KiB-aligned.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageEntry; ENTRIES_PER_TABLE],
}

impl PageTable {
    /// A table with every entry absent.
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PageEntry::zero(); ENTRIES_PER_TABLE],
        }
    }

    /// Clear every entry.
    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PageEntry::zero());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PageEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PageEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// `true` if no slot is in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.is_zero())
    }

    /// Iterate `(index, entry)` over the used slots.
    pub fn iter_used(&self) -> impl Iterator<Item = (TableIndex, PageEntry)> + '_ {
        self.entries
            .iter()
            .zip(0_u16..)
            .filter(|(e, _)| !e.is_zero())
            .map(|(e, i)| (TableIndex(i), *e))
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::zeroed()
    }
}

const _: () = {
    assert!(size_of::<PageTable>() == 4096);
    assert!(align_of::<PageTable>() == 4096);
};
