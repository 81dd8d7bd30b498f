//! Architecture back-ends. One [`PagingController`](crate::PagingController)
//! implementation per supported layout.

pub mod x86_64;

/// The controller for the architecture being compiled for.
#[cfg(target_arch = "x86_64")]
pub type PlatformPagingController<A> = x86_64::X86_64PagingController<A, x86_64::X86Mmu>;
