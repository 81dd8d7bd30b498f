//! # Typed `X86_64` Registers
//!
//! The two privileged primitives the paging engine needs:
//!
//! - [`cr3::Cr3`]: the translation-root register (PML4 base).
//! - [`tlb`]: per-page TLB invalidation (`invlpg`) and full flushes.
//!
//! Inline assembly is only compiled with the `asm` feature on `x86_64`
//! targets; the bit layouts themselves are plain data and usable anywhere.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "tlb")]
pub mod tlb;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}
