//! Object identifiers (§3, §4.1).
//!
//! A [`Uid`] is the only thing callers ever hold onto: it names an object
//! whether that object is currently resident in memory or has been written
//! out to a backing arena. The object-type tag travels with the identifier
//! itself so the storage router (`bistorage`) can dispatch without
//! consulting any side table.

use std::fmt;

/// Small integer tag distinguishing interior vs. leaf nodes (and other
/// variants the tree above us may define). Opaque to this crate beyond
/// being used for router dispatch and debug formatting.
pub type ObjectType = u8;

/// Which medium a persisted [`Uid`] refers to.
///
/// A volatile-pointer UID's payload is a pointer-sized token minted when
/// the wrapper was created; it stays valid for as long as the wrapper
/// remains resident (§3, invariant ii). A `File`/`PMem` UID's payload is an
/// `(offset, size)` pair inside that backend's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StorageMedium {
    /// Not yet persisted; payload is a volatile pointer token.
    Volatile,
    /// Persisted in the file backend's arena.
    File,
    /// Persisted in the PMem backend's arena.
    PMem,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Payload {
    /// Token identifying a resident wrapper. Not a real pointer — see
    /// `object::WrapperHandle` for why a generation-tagged token is used
    /// instead of an actual `*const`.
    Volatile(u64),
    Persisted { offset: u64, size: u32 },
}

/// A 128-bit packed object identifier: object-type tag, storage medium, and
/// either a volatile token or a persisted `(offset, size)` pair.
///
/// Equality is bit-exact on the full record (derived `PartialEq`), matching
/// §4.1's "Equality is bit-exact on the full record."
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid {
    object_type: ObjectType,
    medium: StorageMedium,
    payload: Payload,
}

impl Uid {
    /// Construct a UID for a freshly created, not-yet-persisted object.
    pub fn from_volatile_pointer(object_type: ObjectType, pointer: u64) -> Self {
        Uid {
            object_type,
            medium: StorageMedium::Volatile,
            payload: Payload::Volatile(pointer),
        }
    }

    /// Construct a UID for an object that has been written to a backing
    /// arena at `offset`, occupying `size` bytes.
    pub fn from_persistent_offset(
        object_type: ObjectType,
        medium: StorageMedium,
        offset: u64,
        size: u32,
    ) -> Self {
        debug_assert!(
            !matches!(medium, StorageMedium::Volatile),
            "a persistent UID cannot carry the Volatile medium tag"
        );
        Uid {
            object_type,
            medium,
            payload: Payload::Persisted { offset, size },
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn storage_medium(&self) -> StorageMedium {
        self.medium
    }

    /// True iff this UID's medium is not `Volatile`.
    pub fn is_persisted(&self) -> bool {
        !matches!(self.medium, StorageMedium::Volatile)
    }

    /// The backing-arena byte offset, if this UID is persisted.
    pub fn persistent_offset(&self) -> Option<u64> {
        match self.payload {
            Payload::Persisted { offset, .. } => Some(offset),
            Payload::Volatile(_) => None,
        }
    }

    /// The number of bytes this UID's object occupies in the backing
    /// arena, if persisted.
    pub fn persistent_size(&self) -> Option<u32> {
        match self.payload {
            Payload::Persisted { size, .. } => Some(size),
            Payload::Volatile(_) => None,
        }
    }

    /// The volatile token, if this UID hasn't been persisted.
    pub fn volatile_token(&self) -> Option<u64> {
        match self.payload {
            Payload::Volatile(token) => Some(token),
            Payload::Persisted { .. } => None,
        }
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload {
            Payload::Volatile(token) => f
                .debug_struct("Uid")
                .field("object_type", &self.object_type)
                .field("medium", &self.medium)
                .field("token", &format_args!("{token:#x}"))
                .finish(),
            Payload::Persisted { offset, size } => f
                .debug_struct("Uid")
                .field("object_type", &self.object_type)
                .field("medium", &self.medium)
                .field("offset", &format_args!("{offset:#x}"))
                .field("size", &size)
                .finish(),
        }
    }
}

/// Mints unique volatile tokens for newly created objects.
///
/// Grounded in the `IdTracker`/`PageReadTracker` pattern of a small
/// counter struct owning exactly one piece of monotonic state
/// (`crab-db-alloc/src/lib.rs`).
#[derive(Debug, Default)]
pub struct TokenMint {
    next: std::sync::atomic::AtomicU64,
}

impl TokenMint {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// A mint whose first token is `seed`. Used to give independent token
    /// spaces disjoint ranges — see `VolatileBackend`, whose
    /// backend-assigned tokens must never collide with a `Cache`'s own
    /// not-yet-persisted tokens even though both use the same `Volatile`
    /// medium tag.
    pub fn starting_at(seed: u64) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(seed),
        }
    }

    pub fn mint(&self) -> u64 {
        self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}
