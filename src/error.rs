use thiserror::Error;

/// Error taxonomy for the whole cache subsystem (allocator, storage
/// backends, router, and replacement policies all funnel into this one
/// enum, mirroring how `AllocError` used to be the allocator's sole error
/// type before the allocator became one collaborator among several).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    /// Couldn't open the backing file
    #[error("Opening the backing file failed")]
    Open(#[source] std::io::Error),
    /// Couldn't lock the backing file
    #[error("Failed to lock the backing file for exclusive use")]
    Lock(#[source] std::io::Error),
    /// Couldn't synchronize to the backing file
    #[error("Synchronizing to the backing file failed")]
    Sync(#[source] std::io::Error),
    /// Couldn't resize the backing file
    #[error(
        "Can't resize the backing file. Have 0x{size:x} bytes, wanted to get 0x{requested:x} bytes"
    )]
    ResizeFailed {
        size: usize,
        requested: usize,
        source: std::io::Error,
    },
    /// Couldn't allocate any more space in the backing arena
    #[error("Can't allocate any more memory map space. Tried to get 0x{requested:x} bytes")]
    AllocFailed {
        requested: usize,
        source: std::io::Error,
    },
    #[error("Punching a hole in the sparse memory map failed")]
    HolePunch(#[source] std::io::Error),
    /// The bitmap allocator has no run of free blocks large enough to
    /// satisfy the request.
    #[error("out of storage: no run of {blocks} block(s) available ({available} free blocks remain)")]
    OutOfStorage { blocks: u32, available: u32 },
    /// A plain read/write against a backend failed.
    #[error("I/O failure in storage backend")]
    Io(#[source] std::io::Error),
    /// `remove` was called on a UID that isn't live anywhere.
    #[error("key does not exist: {0:?}")]
    KeyDoesNotExist(crate::uid::Uid),
    /// The requested operation isn't implemented by this build or backend.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    /// Other, miscellaneous errors
    #[error("Other: {0}")]
    Other(&'static str),
    #[error("Invalid access on the memory map was attempted. Tried to get slice at offset 0x{offset:x} with length 0x{len:x}")]
    InvalidAccess { offset: usize, len: usize },
    #[error("Data integrity hash failed for data at offset 0x{offset:x} with length {len}")]
    HashFailed { offset: usize, len: usize },
    /// Corruption detected in persisted data (bad header, hash mismatch, etc).
    #[error("data corruption: {0}")]
    Corrupt(&'static str),
}

impl CacheError {
    /// True if this error corresponds to the `out-of-storage` wire kind (§7).
    pub fn is_out_of_storage(&self) -> bool {
        matches!(self, CacheError::OutOfStorage { .. })
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
