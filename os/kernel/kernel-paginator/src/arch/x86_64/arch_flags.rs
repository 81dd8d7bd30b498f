//! # x86-64 entry flags and the neutral-flag translator

use crate::flags::PageFlags;

bitflags::bitflags! {
    /// Hardware flag bits of an x86-64 paging entry (any level).
    ///
    /// Only the low 12 bits and bit 63 are flags; bits 12..=51 hold the frame
    /// address and are never part of this set.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ArchFlags: u64 {
        /// Entry is valid.
        const PRESENT = 1 << 0;
        /// Writes allowed; clear means read-only.
        const WRITABLE = 1 << 1;
        /// User mode (CPL 3) may access through this entry.
        const USER = 1 << 2;
        /// Write-through caching.
        const WRITE_THROUGH = 1 << 3;
        /// Caching disabled.
        const CACHE_DISABLE = 1 << 4;
        /// Set by the CPU on access.
        const ACCESSED = 1 << 5;
        /// Set by the CPU on first write (leaf only).
        const DIRTY = 1 << 6;
        /// PS: huge page in a PDE/PDPTE. Reads as PAT in an L1 PTE.
        const HUGE_PAGE = 1 << 7;
        /// Survives CR3 reloads if CR4.PGE is set (leaf only).
        const GLOBAL = 1 << 8;
        /// Instruction fetches forbidden (requires EFER.NXE).
        const NO_EXECUTE = 1 << 63;
    }
}

impl ArchFlags {
    /// Flags of every intermediate (table-pointing) entry created by the walker.
    ///
    /// Effective permissions are the intersection over the walk, so these are
    /// as permissive as possible and leaves decide.
    pub const TABLE: Self = Self::PRESENT.union(Self::WRITABLE).union(Self::USER);

    /// Flags of the root's recursive slot. Page tables stay supervisor-only
    /// and are never executable.
    pub const RECURSIVE: Self = Self::PRESENT
        .union(Self::WRITABLE)
        .union(Self::NO_EXECUTE);

    /// Translate neutral leaf flags into their x86-64 encoding.
    ///
    /// Execute permission is inverted: the hardware executes unless NX is
    /// set, so a missing [`PageFlags::EXECUTE`] turns into [`NO_EXECUTE`](Self::NO_EXECUTE).
    /// [`PageFlags::READ`] has no counterpart.
    #[must_use]
    pub const fn from_page_flags(flags: PageFlags) -> Self {
        let mut arch = Self::empty();
        if flags.is_present() {
            arch = arch.union(Self::PRESENT);
        }
        if flags.is_user_accessible() {
            arch = arch.union(Self::USER);
        }
        if flags.is_writable() {
            arch = arch.union(Self::WRITABLE);
        }
        if flags.is_huge_page() {
            arch = arch.union(Self::HUGE_PAGE);
        }
        if !flags.is_executable() {
            arch = arch.union(Self::NO_EXECUTE);
        }
        arch
    }
}

impl From<PageFlags> for ArchFlags {
    #[inline]
    fn from(flags: PageFlags) -> Self {
        Self::from_page_flags(flags)
    }
}
