//! # Architecture-neutral page flags
//!
//! Callers describe *what* a mapping may do; the architecture module decides
//! how that is spelled in hardware (see `ArchFlags` for x86-64).

bitflags::bitflags! {
    /// Permission and shape bits of one mapping.
    ///
    /// `READ` has no hardware bit on x86-64: a present page is always
    /// readable, and the absence of `WRITE` makes it read-only. It is accepted
    /// for portability and otherwise ignored.
    ///
    /// `HUGE_PAGE` is carried into the leaf encoding but does not shorten the
    /// walk; every mapping is installed as a 4 KiB leaf.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PageFlags: u16 {
        /// The mapping is valid.
        const PRESENT = 1;
        /// User mode (CPL 3) may access the page.
        const USER_MODE_ACCESSIBLE = 1 << 1;
        /// Instructions may be fetched from the page.
        const EXECUTE = 1 << 2;
        /// The page is writable.
        const WRITE = 1 << 3;
        /// The page is readable.
        const READ = 1 << 4;
        /// The mapping is meant as a huge page.
        const HUGE_PAGE = 1 << 15;
    }
}

impl PageFlags {
    /// Kernel data: present, readable, writable, not executable.
    pub const KERNEL_DATA: Self = Self::PRESENT.union(Self::READ).union(Self::WRITE);

    /// Kernel code: present, readable, executable, read-only.
    pub const KERNEL_CODE: Self = Self::PRESENT.union(Self::READ).union(Self::EXECUTE);

    /// What the loader uses when identity-mapping firmware regions before the
    /// hand-off: everything allowed.
    pub const BOOT_IDENTITY: Self = Self::PRESENT
        .union(Self::READ)
        .union(Self::WRITE)
        .union(Self::EXECUTE)
        .union(Self::USER_MODE_ACCESSIBLE);

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.contains(Self::PRESENT)
    }

    #[inline]
    #[must_use]
    pub const fn is_user_accessible(self) -> bool {
        self.contains(Self::USER_MODE_ACCESSIBLE)
    }

    #[inline]
    #[must_use]
    pub const fn is_executable(self) -> bool {
        self.contains(Self::EXECUTE)
    }

    #[inline]
    #[must_use]
    pub const fn is_writable(self) -> bool {
        self.contains(Self::WRITE)
    }

    #[inline]
    #[must_use]
    pub const fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    #[inline]
    #[must_use]
    pub const fn is_huge_page(self) -> bool {
        self.contains(Self::HUGE_PAGE)
    }
}
