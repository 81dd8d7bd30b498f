use crate::{MemoryAddress, PageSize, Size4K};
use core::fmt;
use core::ops::Add;

/// Virtual memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// Construction does not validate canonicality; the paging engine checks it
/// with [`is_canonical`](Self::is_canonical) before touching any table.
///
/// ### Canonical form (4-level paging)
///
/// ```text
/// | 63 ‒ 48        | 47 | 46 ‒ 0                |
/// | copies of bit 47 | s | translated address bits |
/// ```
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// assert!(VirtualAddress::new(0x0000_7FFF_FFFF_F000).is_canonical());
/// assert!(VirtualAddress::new(0xFFFF_8000_0000_0000).is_canonical());
/// assert!(!VirtualAddress::new(0x0000_8000_0000_0000).is_canonical());
///
/// let va = VirtualAddress::new(0x0000_8000_0000_0000).canonicalize();
/// assert_eq!(va.as_u64(), 0xFFFF_8000_0000_0000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

impl VirtualAddress {
    /// Number of translated bits with 4-level paging.
    pub const TRANSLATED_BITS: u32 = 48;

    #[inline]
    #[must_use]
    pub const fn from_ptr<T>(ptr: *const T) -> Self {
        Self(MemoryAddress::from_ptr(ptr))
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// Bits 48..=63 are either all zero or all one, and agree with bit 47.
    #[inline]
    #[must_use]
    pub const fn is_canonical(self) -> bool {
        self.canonicalize().as_u64() == self.as_u64()
    }

    /// Sign-extend bit 47 into bits 48..=63.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn canonicalize(self) -> Self {
        const SHIFT: u32 = 64 - VirtualAddress::TRANSLATED_BITS;
        Self::new((((self.as_u64() << SHIFT) as i64) >> SHIFT) as u64)
    }

    /// Byte offset inside the containing 4 KiB page.
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.0.offset::<Size4K>()
    }

    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0.align_down::<S>())
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0.is_aligned::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self::new(self.as_u64() + rhs)
    }
}
