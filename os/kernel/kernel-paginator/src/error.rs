use kernel_memory_addresses::PhysicalAddress;

/// Failure of a mapping operation.
///
/// Nothing is retried internally. On error the hierarchy is left consistent:
/// intermediate tables that were already linked stay linked (and empty), no
/// leaf is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[must_use = "mapping errors must be handled"]
pub enum MapError {
    /// Non-canonical address, or an address inside the recursive window.
    #[error("invalid virtual address")]
    InvalidVirtualAddress,
    /// The target frame is not 4 KiB aligned.
    #[error("physical address is not page aligned")]
    InvalidPhysicalAddress,
    /// A mapping exists and overwriting was not requested.
    #[error("an entry already exists")]
    EntryExists,
    /// The frame allocator returned no (or an unusable) frame.
    #[error("frame allocation failed")]
    AllocFailed,
    /// Nothing is mapped at the address.
    #[error("address is not mapped")]
    NotMapped,
    /// The hierarchy is in a state this engine never produces.
    #[error("unknown paging error")]
    UnknownError,
}

/// Failure to make a hierarchy the active one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationError {
    /// The recursive slot of the active root is empty, so the root's own
    /// physical address cannot be recovered through the window.
    #[error("recursive slot of the root table is empty")]
    RecursiveSlotMissing,
    /// The root cannot be used as a translation base.
    #[error("root table {0} is not a valid translation base")]
    InvalidRoot(PhysicalAddress),
    /// The root could not be prepared for activation.
    #[error(transparent)]
    Map(#[from] MapError),
}
