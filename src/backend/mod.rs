//! Storage backends: the three media a [`Uid`](crate::uid::Uid) can name
//! (§4.1, §4.3).
//!
//! Each backend owns one arena and one allocator; the router in
//! [`crate::bistorage`] is the only thing that knows which object types go
//! to which backend.

pub mod file;
pub mod pmem;
pub mod volatile;

use crate::error::Result;
use crate::uid::{ObjectType, StorageMedium, Uid};

/// Relative read/write cost reported by a backend, consulted by the
/// device-aware selector and by diagnostics. Grounded on
/// `BiStorage::getAccessCost`, which tracks a running cost per node type
/// per storage tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessCost {
    pub read_cost: f64,
    pub write_cost: f64,
}

impl AccessCost {
    pub const ZERO: AccessCost = AccessCost {
        read_cost: 0.0,
        write_cost: 0.0,
    };
}

/// A storage tier backing persisted objects of one or more object types.
///
/// `write` always allocates a fresh range and returns the `Uid` for it;
/// callers that want in-place reuse (`InPlaceHint::SameRange`) go through
/// [`Backend::overwrite`] instead. `read_bytes` returns the raw payload
/// rather than a deserialized `T` so the trait stays object-safe — the
/// router and the cache façade both need to hold heterogeneous backends
/// behind `dyn Backend`, and a generic `read<T>` method would rule that
/// out. Deserialization happens one layer up, where `T` is known
/// statically.
pub trait Backend: Send + Sync {
    fn medium(&self) -> StorageMedium;

    /// Read back and integrity-check the raw bytes for a persisted UID.
    fn read_bytes(&self, uid: Uid) -> Result<Vec<u8>>;

    /// Persist `bytes` as a new object of `object_type`, returning its UID.
    fn write(&self, object_type: ObjectType, bytes: &[u8]) -> Result<Uid>;

    /// Overwrite the range named by `uid` in place, if `bytes` still fits;
    /// returns `Ok(None)` (not an error) when the range is too small and
    /// the caller should fall back to [`Backend::write`] plus
    /// [`Backend::remove`] of the old range.
    fn overwrite(&self, uid: Uid, bytes: &[u8]) -> Result<Option<Uid>>;

    /// Release the range named by `uid` back to the backend's allocator.
    fn remove(&self, uid: Uid) -> Result<()>;

    /// Force any buffered writes out (§4.3's writeback flush contract).
    fn flush(&self) -> Result<()>;

    fn access_cost(&self) -> AccessCost;
}
