//! # x86-64 four-level paging
//!
//! ```text
//! | 63‒48 sign | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  = bit 47  |  L4   |  L3   |  L2   |  L1   | Offset |
//! ```
//!
//! - [`PageEntry`] packs a frame and its [`ArchFlags`] into 64 bits.
//! - [`PageTable`] is one 512-entry level; [`TableIndices`] split an address.
//! - [`RecursiveWindow`] computes where each table is visible once paging is on.
//! - [`Mmu`] abstracts `invlpg` and `mov cr3`.
//! - [`X86_64PagingController`] ties it together behind
//!   [`PagingController`](crate::PagingController).

mod arch_flags;
mod controller;
mod entry;
mod mmu;
mod table;
mod walker;
mod window;

pub use arch_flags::ArchFlags;
pub use controller::X86_64PagingController;
pub use entry::{ADDRESS_MASK, PageEntry};
#[cfg(target_arch = "x86_64")]
pub use mmu::X86Mmu;
pub use mmu::Mmu;
pub use table::{Level, PageTable, TableIndex, TableIndices};
pub use window::RecursiveWindow;
