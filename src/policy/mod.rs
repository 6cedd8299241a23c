//! Pluggable cache replacement policies (§4.6).
//!
//! Each policy owns its own slot-indexed store of resident wrappers and
//! its own index from [`Uid`] to slot — the "arena + slot index"
//! replacement for the original's pointer/`Rc` graphs, inlined directly
//! into each policy rather than shared, since LRU's doubly-linked list,
//! CLOCK's circular array, and A2Q's three queues each need different
//! slot bookkeeping around it. A [`CachePolicy`] never touches a backend
//! directly; the façade in [`crate::cache`] is the only thing that moves
//! bytes, so a policy can be swapped without changing how persistence
//! works.

pub mod a2q;
pub mod clock;
pub mod lru;

use crate::object::{CoreObject, WrapperHandle};
use crate::uid::Uid;

pub(crate) type SlotIndex = usize;

/// The operations every replacement policy implements.
///
/// Eviction (`evict_one`) must honor two invariants regardless of policy:
/// a wrapper with a non-zero in-use count is never chosen (§5), and a
/// wrapper with live in-cache dependents is skipped in favor of the next
/// candidate (§4.7).
pub trait CachePolicy<T: CoreObject>: Send + Sync {
    /// Track a newly resident wrapper.
    fn insert(&mut self, handle: WrapperHandle<T>);

    /// Record a hit against an already-resident object, updating whatever
    /// recency/frequency bookkeeping the policy uses.
    fn touch(&mut self, uid: Uid);

    /// Record a hit posted as part of `update_objects_access_metadata(depth,
    /// path)` (§4.6), carrying how many levels remain below `uid` along the
    /// root-first path (the root gets the largest `depth_remaining`).
    /// Policies that don't distinguish depth (LRU, A2Q) fall back to a
    /// plain recency touch; CLOCK overrides this to set the slot's weight
    /// directly so ancestors linger through more eviction sweeps than
    /// their descendants (§4.6.2).
    fn touch_with_depth(&mut self, uid: Uid, depth_remaining: u32) {
        let _ = depth_remaining;
        self.touch(uid);
    }

    /// Stop tracking `uid` (explicit delete or post-writeback discard) and
    /// hand back its handle, if it was resident.
    fn remove(&mut self, uid: Uid) -> Option<WrapperHandle<T>>;

    /// Notify the policy that a UID it may still remember in some
    /// secondary structure (e.g. A2Q's ghost queue) has been relocated by
    /// writeback. Most policies only track resident wrappers by their
    /// current UID, which `remove`+`insert` already re-keys, so the
    /// default is a no-op.
    fn notify_relocated(&mut self, _old: Uid, _new: Uid) {}

    /// Select and stop tracking one eviction victim. Returns `None` if
    /// every resident wrapper is either in-use or has live dependents.
    fn evict_one(&mut self) -> Option<WrapperHandle<T>>;

    fn contains(&self, uid: Uid) -> bool;

    fn get(&self, uid: Uid) -> Option<WrapperHandle<T>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether a candidate wrapper may be evicted right now: not in use, and
/// no other resident wrapper depends on it (§4.7, §5) — unless the tree
/// has logically deleted it (`mark_delete`), in which case reclamation
/// proceeds regardless of dependents (§3, §4.6.2 eviction rule 4): a node
/// the tree has freed can't legitimately still be someone's live child
/// pointer.
pub(crate) fn evictable<T: CoreObject>(handle: &WrapperHandle<T>) -> bool {
    if handle.in_use() {
        return false;
    }
    let state = handle.lock();
    state.mark_delete || !state.core_object.as_ref().map(CoreObject::have_dependents_in_cache).unwrap_or(false)
}
