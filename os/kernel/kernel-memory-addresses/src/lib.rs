//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the raw addresses handled by the paging engine.
//!
//! ## Overview
//!
//! Page-table code constantly juggles two kinds of 64-bit numbers: addresses the
//! CPU *translates* (virtual) and addresses it *emits on the bus* (physical).
//! Mixing the two up is the classic paging bug, especially around the moment
//! translation is switched on. The types in this crate keep them apart at
//! compile time while staying zero-cost `u64` wrappers.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`VirtualAddress`] | An address subject to page-table translation. |
//! | [`PhysicalAddress`] | A physical RAM / MMIO address. |
//! | [`PhysicalPage<S>`] | A page-aligned physical frame of size `S`. |
//!
//! ## Page Sizes
//!
//! - [`Size4K`]: 4 KiB pages, the granularity of every table and leaf.
//! - [`Size2M`]: 2 MiB huge pages (representable, not walked specially).
//!
//! ## Canonical addresses
//!
//! With 4-level paging only 48 bits of a virtual address are translated; bits
//! 48..=63 must replicate bit 47. [`VirtualAddress::is_canonical`] checks that
//! and [`VirtualAddress::canonicalize`] produces it.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xFFFF_8000_0000_1234);
//! assert!(va.is_canonical());
//! assert_eq!(va.page_offset(), 0x234);
//!
//! let bad = VirtualAddress::new(0x0001_0000_0000_0000);
//! assert!(!bad.is_canonical());
//!
//! let pa = PhysicalAddress::new(0x0010_2000);
//! assert!(pa.is_aligned::<Size4K>());
//! assert_eq!(PhysicalPage::<Size4K>::try_from_addr(pa).map(PhysicalPage::base), Some(pa));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod memory_address;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use crate::memory_address::MemoryAddress;
pub use crate::page_size::{PageSize, Size2M, Size4K};
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;
pub use crate::virtual_address::VirtualAddress;
