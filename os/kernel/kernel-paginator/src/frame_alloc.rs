//! # Physical frame allocation for page tables

use crate::info::PHYSICAL_ADDRESS_LIMIT;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use log::warn;

/// Source of fresh **physical** 4 KiB frames for intermediate tables.
///
/// The paging engine never frees what it obtains here. Returned frames must
/// be 4 KiB aligned and below [`PHYSICAL_ADDRESS_LIMIT`]; they do not need to
/// be zeroed, the walker clears every table it links.
///
/// Any `FnMut() -> u64` closure is a `FrameAlloc`: it returns the physical
/// address of a frame, `0` meaning "out of memory". Bind whatever context
/// the allocation needs (boot services, a bitmap, ...) into the closure.
///
/// ```rust
/// # use kernel_paginator::FrameAlloc;
/// let mut next = 0x10_0000_u64;
/// let mut alloc = move || {
///     let frame = next;
///     next += 4096;
///     frame
/// };
/// assert_eq!(alloc.alloc_4k().unwrap().base().as_u64(), 0x10_0000);
/// assert_eq!(alloc.alloc_4k().unwrap().base().as_u64(), 0x10_1000);
/// ```
pub trait FrameAlloc {
    /// Allocate one 4 KiB frame, `None` on exhaustion.
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>>;
}

impl<F> FrameAlloc for F
where
    F: FnMut() -> u64,
{
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        let pa = PhysicalAddress::new(self());
        if pa.is_zero() {
            return None;
        }

        let Some(page) = PhysicalPage::<Size4K>::try_from_addr(pa) else {
            warn!("frame allocator returned unaligned frame {pa}");
            return None;
        };
        if pa.as_u64() >= PHYSICAL_ADDRESS_LIMIT {
            warn!("frame allocator returned {pa}, beyond the physical address space");
            return None;
        }
        Some(page)
    }
}
