//! Buffer-pool / page-cache subsystem for a B+-tree index.
//!
//! A [`Cache`] sits between a B+-tree implementation and the bytes its
//! nodes eventually live in. The tree hands the cache serializable node
//! types (anything implementing [`CoreObject`]); the cache takes care of
//! residency, eviction, and tiered persistence, and only ever hands back
//! an opaque [`Uid`] or a [`WrapperHandle`] the tree can dereference.
//!
//! The pieces, roughly bottom-up:
//! - [`uid`] — object identifiers and the volatile-token mint
//! - [`object`] — the `CoreObject` trait and the wrapper that makes a
//!   `T: CoreObject` safe to share and evict
//! - [`alloc`] — the SIMD bitmap block allocator backing the persistent
//!   arenas
//! - [`backend`] — the three storage media (`Volatile`, `File`, `PMem`)
//! - [`bistorage`] — routes objects to a backend by object-type tag
//! - [`policy`] — pluggable eviction policies (LRU, CLOCK, 2Q)
//! - [`selector`] — the device-aware policy recommendation table
//! - [`flusher`] — the background writeback thread
//! - [`cache`] — the façade tying all of the above together

pub mod alloc;
pub mod backend;
pub mod bistorage;
pub mod cache;
pub mod error;
pub mod flusher;
pub mod object;
pub mod policy;
pub mod selector;
pub mod uid;

pub use crate::cache::{Cache, CacheBuilder};
pub use crate::error::{CacheError, Result};
pub use crate::object::{CoreObject, InPlaceHint, WrapperHandle, WrapperState};
pub use crate::selector::{select_policy, CachePolicyType, PolicyConfig, StorageDeviceType, WorkloadType};
pub use crate::uid::{ObjectType, StorageMedium, TokenMint, Uid};
