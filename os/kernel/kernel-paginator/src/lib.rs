//! # Paginator
//!
//! Builds, walks and activates x86-64 four-level page tables, from the UEFI
//! loader (before the kernel's own tables are live) and from the kernel
//! afterwards.
//!
//! ## What you get
//! - A [`PagingController`] trait (map, identity map, unmap, translate,
//!   activate) with one implementation per architecture under [`arch`].
//! - Neutral [`PageFlags`] translated to the hardware encoding by the back-end.
//! - A [`FrameAlloc`] interface for the frames new tables live in; any
//!   `FnMut() -> u64` closure qualifies.
//! - [`region`] helpers to identity-map a firmware memory map.
//!
//! ## Two ways to reach a table
//!
//! ```text
//!   PagingMode::Disabled                PagingMode::Enabled
//!   ────────────────────                ───────────────────
//!   table frame PA ──(identity)──► ptr  VA in recursive window ──(MMU)──► table
//! ```
//!
//! Before the loader activates its hierarchy, firmware identity-maps all RAM,
//! so a frame's physical address is also a valid pointer; that assumption is
//! the [`IdentityAccess`] token. Afterwards tables are only reachable through
//! the root's self-reference at slot [`info::RECURSIVE_INDEX`], which exposes
//! every table at a computable virtual address
//! ([`RecursiveWindow`](arch::x86_64::RecursiveWindow)).
//!
//! ## Example
//!
//! ```rust,no_run
//! # use kernel_paginator::{IdentityAccess, PageFlags, PagingController, PagingMode};
//! # use kernel_paginator::arch::PlatformPagingController;
//! # use kernel_paginator::arch::x86_64::X86Mmu;
//! # use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
//! # fn allocate_zeroed_frame() -> u64 { unimplemented!() }
//! let root = PhysicalPage::<Size4K>::containing(PhysicalAddress::new(allocate_zeroed_frame()));
//! let mut ctl: PlatformPagingController<_> = unsafe {
//!     let mode = PagingMode::Disabled(IdentityAccess::assume());
//!     PlatformPagingController::new(root, allocate_zeroed_frame, X86Mmu::new(), mode)
//! };
//!
//! ctl.identity_map_page(PhysicalAddress::new(0x1000), PageFlags::KERNEL_DATA, false)?;
//! unsafe { ctl.activate()? };
//! # Ok::<(), kernel_paginator::ActivationError>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

pub mod arch;
mod controller;
mod error;
mod flags;
mod frame_alloc;
pub mod info;
pub mod region;

pub use crate::controller::{ControllerState, IdentityAccess, PagingController, PagingMode};
pub use crate::error::{ActivationError, MapError};
pub use crate::flags::PageFlags;
pub use crate::frame_alloc::FrameAlloc;
pub use crate::region::{
    MemoryRegion, RegionKind, RegionMapError, RegionMapSummary, identity_map_boot_regions,
    identity_map_region, map_region,
};
