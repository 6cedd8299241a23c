//! The cached object wrapper (§3) and the trait tree nodes must implement
//! to be cacheable at all.
//!
//! The cache never interprets node bytes itself — `CoreObject::serialize`
//! and `CoreObject::deserialize` are the only bridge, preserved verbatim
//! per the design notes' "serialization boundary."

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::uid::{ObjectType, Uid};

/// Hint returned by [`CoreObject::serialize`] about where the bytes landed.
///
/// A backend may reuse an object's previous persisted range if the new
/// serialized form still fits (§4.3: "Serialization may occasionally
/// return an in-place target pointer... `updated_uid` equals the old
/// UID"). [`InPlaceHint::Fresh`] means the backend must allocate a new
/// range; [`InPlaceHint::SameRange`] means the old range may be reused
/// verbatim, provided it's still large enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InPlaceHint {
    Fresh,
    SameRange,
}

/// The interface the cache requires of a deserialized B+-tree node.
///
/// Everything else about the node — key comparisons, splits, merges — is
/// the tree's business; this crate only needs enough to move bytes in and
/// out of a backing arena and to honor the dependent-safety invariant
/// (§4.7).
pub trait CoreObject: Send + Sync + Sized + 'static {
    /// The tag used by the storage router and the device-aware selector.
    fn object_type(&self) -> ObjectType;

    /// Serialize into `buf`, replacing its contents, and report whether
    /// the caller may reuse the object's previous persisted range.
    fn serialize(&self, buf: &mut Vec<u8>) -> InPlaceHint;

    /// Reconstruct a core object from its serialized bytes.
    fn deserialize(bytes: &[u8], object_type: ObjectType) -> Result<Self>;

    /// True iff another resident wrapper holds an in-memory reference to
    /// this object (§4.7). Interior nodes referencing not-yet-persisted
    /// children by volatile pointer are the typical case. Default `false`
    /// is correct for leaves, which reference nothing else in the cache.
    fn have_dependents_in_cache(&self) -> bool {
        false
    }
}

/// The mutable state of a cached object wrapper, guarded by the wrapper's
/// own mutex so writeback can be serialized against readers/writers of the
/// same object (§5).
pub struct WrapperState<T: CoreObject> {
    pub uid: Uid,
    pub uid_updated: Option<Uid>,
    pub core_object: Option<T>,
    pub dirty: bool,
    pub mark_delete: bool,
    /// Last-observed read cost reported by the storage layer; `0` when
    /// cost weighting is disabled.
    pub object_cost: u64,
}

impl<T: CoreObject> WrapperState<T> {
    fn new(uid: Uid, core_object: T) -> Self {
        WrapperState {
            uid,
            uid_updated: None,
            core_object: Some(core_object),
            dirty: false,
            mark_delete: false,
            object_cost: 0,
        }
    }
}

struct WrapperInner<T: CoreObject> {
    in_use: AtomicUsize,
    state: Mutex<WrapperState<T>>,
}

/// A handle to a cached object wrapper.
///
/// Cloning a handle is cheap (it's an `Arc`); every clone observes the same
/// underlying wrapper. The atomic `in_use` counter lives outside the
/// wrapper's own mutex so the tree can mark/clear in-use without taking the
/// lock that serializes writeback — this degrades exactly to the
/// non-concurrent `in_use_flag` contract when a given handle is only ever
/// touched from one thread (§5's resolved build-profile question, see
/// DESIGN.md).
pub struct WrapperHandle<T: CoreObject> {
    inner: Arc<WrapperInner<T>>,
}

impl<T: CoreObject> Clone for WrapperHandle<T> {
    fn clone(&self) -> Self {
        WrapperHandle {
            inner: self.inner.clone(),
        }
    }
}

impl<T: CoreObject> PartialEq for WrapperHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<T: CoreObject> Eq for WrapperHandle<T> {}

impl<T: CoreObject> WrapperHandle<T> {
    pub fn new(uid: Uid, core_object: T) -> Self {
        WrapperHandle {
            inner: Arc::new(WrapperInner {
                in_use: AtomicUsize::new(0),
                state: Mutex::new(WrapperState::new(uid, core_object)),
            }),
        }
    }

    /// Lock the wrapper's critical section.
    pub fn lock(&self) -> MutexGuard<'_, WrapperState<T>> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Try to lock without blocking; used by CLOCK's eviction sweep, which
    /// must advance past busy slots rather than wait (§4.6.2 rule 4).
    pub fn try_lock(&self) -> Option<MutexGuard<'_, WrapperState<T>>> {
        match self.inner.state.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::WouldBlock) => None,
            Err(std::sync::TryLockError::Poisoned(p)) => Some(p.into_inner()),
        }
    }

    /// Increment the in-use counter. The tree calls this on handoff.
    pub fn mark_in_use(&self) {
        self.inner.in_use.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement the in-use counter. Called as part of consuming
    /// `update_objects_access_metadata` (§4.6).
    pub fn clear_in_use(&self) {
        let prev = self.inner.in_use.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "in-use counter underflow: more releases than handoffs");
    }

    /// Non-zero forbids eviction.
    pub fn in_use(&self) -> bool {
        self.inner.in_use.load(Ordering::Acquire) > 0
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Flag this wrapper as logically deleted by the tree (§3). The next
    /// eviction sweep that reaches it reclaims both the slot and its
    /// persisted bytes instead of writing it back.
    pub fn mark_for_deletion(&self) {
        self.lock().mark_delete = true;
    }

    /// §4.7: whether this wrapper's core object is referenced by another
    /// resident wrapper. A wrapper whose core has already been evicted
    /// (`core_object == None`) has nothing left to be a dependency of.
    pub fn have_dependents_in_cache(&self) -> bool {
        self.lock()
            .core_object
            .as_ref()
            .map(CoreObject::have_dependents_in_cache)
            .unwrap_or(false)
    }

    /// The UID this handle currently presents to callers. This is the
    /// wrapper's original identity, not `uid_updated` — see
    /// `cache::RedirectTable` for how stale callers get chased to the
    /// current location after a writeback.
    pub fn uid(&self) -> Uid {
        self.lock().uid
    }
}

/// Reclaim a wrapper whose object has already been written back: clears
/// the core object, leaving the wrapper in the transient null-core state
/// the design notes call out as legitimate only during writeback (§9).
pub(crate) fn discard_core<T: CoreObject>(handle: &WrapperHandle<T>) {
    let mut state = handle.lock();
    state.core_object = None;
}

/// A bug-detecting guard: encountering a null core object during eviction
/// *outside* the writeback window is always a bug (§9). The cache's shared
/// eviction path ([`crate::cache::Cache`]'s `ensure_capacity`) calls this
/// right before it discards a slot handed back by any policy (LRU, CLOCK,
/// A2Q all funnel through it), so the check runs regardless of which
/// policy produced the victim.
pub(crate) fn assert_not_mid_writeback<T: CoreObject>(state: &WrapperState<T>) {
    if state.core_object.is_none() && !state.dirty {
        // A clean wrapper with no core object and nobody currently
        // writing it back has no reason to exist; something freed the
        // core without removing the wrapper from its policy structure.
        panic!("invariant violation: encountered a resident wrapper with a null core object outside of writeback");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Leaf(Vec<u8>);

    impl CoreObject for Leaf {
        fn object_type(&self) -> ObjectType {
            1
        }
        fn serialize(&self, buf: &mut Vec<u8>) -> InPlaceHint {
            buf.clear();
            buf.extend_from_slice(&self.0);
            InPlaceHint::Fresh
        }
        fn deserialize(bytes: &[u8], _object_type: ObjectType) -> Result<Self> {
            Ok(Leaf(bytes.to_vec()))
        }
    }

    #[test]
    fn in_use_counter_tracks_handoffs() {
        let uid = Uid::from_volatile_pointer(1, 1);
        let handle = WrapperHandle::new(uid, Leaf(vec![1, 2, 3]));
        assert!(!handle.in_use());
        handle.mark_in_use();
        handle.mark_in_use();
        assert!(handle.in_use());
        assert_eq!(handle.in_use_count(), 2);
        handle.clear_in_use();
        assert!(handle.in_use());
        handle.clear_in_use();
        assert!(!handle.in_use());
    }

    #[test]
    fn try_lock_fails_while_held() {
        let uid = Uid::from_volatile_pointer(1, 1);
        let handle = WrapperHandle::new(uid, Leaf(vec![]));
        let _guard = handle.lock();
        assert!(handle.try_lock().is_none());
    }
}
