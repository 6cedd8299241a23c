//! The tree-facing façade (§2 Component F, §3, §4.4-§4.7).
//!
//! `Cache<T>` is the only thing the tree talks to: it owns the policy,
//! the two-tier storage router, and the redirect table that lets a
//! caller keep using a stale `Uid` across a writeback relocation (§3).
//! Grounded on `DbCore`'s approach of a small set of `Mutex`-guarded
//! fields rather than one big lock, so independent operations (a read
//! against storage, a policy update) don't serialize against each other
//! more than they have to.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::backend::{volatile::VolatileBackend, Backend};
use crate::bistorage::BiStorage;
use crate::error::{CacheError, Result};
use crate::flusher::Flusher;
use crate::object::{assert_not_mid_writeback, discard_core, CoreObject, InPlaceHint, WrapperHandle};
use crate::policy::CachePolicy;
use crate::selector::PolicyConfig;
use crate::uid::{ObjectType, TokenMint, Uid};

/// Configuration consumed once at [`Cache::open`]/[`Cache::open_anon`]
/// time (§2 Component K). Mirrors the `OpenOptions` builder pattern:
/// sensible defaults, a handful of setters, and a terminal `open*` call.
pub struct CacheBuilder {
    index_node_type: ObjectType,
    data_node_type: ObjectType,
    max_resident: usize,
    flush_interval: Duration,
    policy_config: Option<PolicyConfig>,
}

impl CacheBuilder {
    pub fn new(index_node_type: ObjectType, data_node_type: ObjectType) -> Self {
        CacheBuilder {
            index_node_type,
            data_node_type,
            max_resident: 10_000,
            flush_interval: Duration::from_secs(1),
            policy_config: None,
        }
    }

    /// Cap on resident wrappers before `ensure_capacity` starts evicting.
    pub fn max_resident(&mut self, count: usize) -> &mut Self {
        self.max_resident = count;
        self
    }

    pub fn flush_interval(&mut self, interval: Duration) -> &mut Self {
        self.flush_interval = interval;
        self
    }

    /// Pin the eviction policy explicitly instead of taking the
    /// device-aware selector's recommendation.
    pub fn policy(&mut self, config: PolicyConfig) -> &mut Self {
        self.policy_config = Some(config);
        self
    }

    fn policy_config_or_default<T: CoreObject>(&self) -> PolicyConfig {
        self.policy_config.clone().unwrap_or_else(|| {
            crate::selector::select_policy(
                crate::selector::WorkloadType::Unknown,
                crate::selector::StorageDeviceType::Volatile,
            )
        })
    }

    /// Open a cache with both storage tiers backed purely by DRAM — no
    /// file, no persistence.
    pub fn open_anon<T: CoreObject>(&self) -> Result<Arc<Cache<T>>> {
        let primary: Arc<dyn Backend> = Arc::new(VolatileBackend::new());
        let secondary: Arc<dyn Backend> = Arc::new(VolatileBackend::new());
        self.build(primary, secondary)
    }

    /// Open a cache with both tiers backed by file-mapped arenas, for a
    /// concrete core object type `T`.
    pub fn open<T: CoreObject, P: AsRef<std::path::Path>>(
        &self,
        primary_path: P,
        primary_capacity: u64,
        secondary_path: P,
        secondary_capacity: u64,
        block_size: u32,
    ) -> Result<Arc<Cache<T>>> {
        let primary: Arc<dyn Backend> = Arc::new(crate::backend::file::FileBackend::open(
            primary_path,
            primary_capacity,
            block_size,
        )?);
        let secondary: Arc<dyn Backend> = Arc::new(crate::backend::file::FileBackend::open(
            secondary_path,
            secondary_capacity,
            block_size,
        )?);
        self.build(primary, secondary)
    }

    fn build<T: CoreObject>(&self, primary: Arc<dyn Backend>, secondary: Arc<dyn Backend>) -> Result<Arc<Cache<T>>> {
        let storage = BiStorage::new(self.index_node_type, self.data_node_type, primary, secondary);
        let policy_config = self.policy_config_or_default::<T>();
        let policy = policy_config.build_policy::<T>();

        let cache = Cache {
            storage,
            policy: Mutex::new(policy),
            redirects: Mutex::new(HashMap::new()),
            dirty: Mutex::new(HashSet::new()),
            mint: TokenMint::new(),
            max_resident: self.max_resident,
            flusher: Mutex::new(None),
        };

        let arc = Arc::new(cache);
        let weak = Arc::downgrade(&arc);
        let flusher = Flusher::spawn(self.flush_interval, move || match weak.upgrade() {
            Some(cache) => cache.flush_dirty(),
            None => Ok(()),
        });
        *arc.flusher.lock().unwrap_or_else(|e| e.into_inner()) = Some(flusher);
        Ok(arc)
    }
}

/// The cache façade. See the module docs for the overall shape.
pub struct Cache<T: CoreObject> {
    storage: BiStorage,
    policy: Mutex<Box<dyn CachePolicy<T>>>,
    /// Stale-UID chase table (§3): populated whenever a writeback moves an
    /// object, consulted by `get_object` before falling through to the
    /// policy/backend. Entries are removed once a caller actually
    /// resolves through them, so the table stays bounded by in-flight
    /// relocations rather than growing over the cache's lifetime.
    redirects: Mutex<HashMap<Uid, Uid>>,
    dirty: Mutex<HashSet<Uid>>,
    mint: TokenMint,
    max_resident: usize,
    flusher: Mutex<Option<Flusher>>,
}

impl<T: CoreObject> Cache<T> {
    /// Fetch an object by UID, creating a resident wrapper from the
    /// backend if it isn't already cached. Chases the redirect table
    /// first so a caller holding a UID from before the object's last
    /// writeback still finds it.
    pub fn get_object(&self, uid: Uid) -> Result<WrapperHandle<T>> {
        let resolved = self.resolve_redirect(uid);

        {
            let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(handle) = policy.get(resolved) {
                policy.touch(resolved);
                return Ok(handle);
            }
        }

        // No `is_persisted()` gate here: a `Volatile`-medium UID can still
        // have a real backing copy in a `VolatileBackend`'s table (that
        // tier's own writes carry the same medium tag as a not-yet-flushed
        // token). Let the backend's own lookup decide.
        let bytes = self.storage.read_bytes(resolved)?;
        let object = T::deserialize(&bytes, resolved.object_type())?;
        let handle = WrapperHandle::new(resolved, object);

        let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
        policy.insert(handle.clone());
        drop(policy);
        self.ensure_capacity()?;
        Ok(handle)
    }

    /// Create a brand-new object, resident only (§3's "Volatile" UID
    /// state) until it's first flushed.
    pub fn create_object(&self, object: T) -> Result<WrapperHandle<T>> {
        let object_type = object.object_type();
        let token = self.mint.mint();
        let uid = Uid::from_volatile_pointer(object_type, token);
        let handle = WrapperHandle::new(uid, object);
        handle.lock().dirty = true;

        let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
        policy.insert(handle.clone());
        drop(policy);
        self.mark_dirty(uid);
        self.ensure_capacity()?;
        Ok(handle)
    }

    /// Record that a resident object's core has changed and needs
    /// writeback (§4.4). The wrapper's `dirty` flag and the façade's
    /// dirty set are kept in sync so the background flusher only has to
    /// consult the set.
    pub fn update_object(&self, handle: &WrapperHandle<T>) {
        let uid = {
            let mut state = handle.lock();
            state.dirty = true;
            state.uid
        };
        self.mark_dirty(uid);
        self.policy.lock().unwrap_or_else(|e| e.into_inner()).touch(uid);
    }

    /// Record that `path` (root-first, `depth` entries deep in the tree)
    /// was touched by a completed operation (§4.6's flat-list overload,
    /// §6's `update_objects_access_metadata(depth, path)`). Each wrapper's
    /// distance from the leaf (`depth_remaining = depth - index`) is
    /// passed through so CLOCK can weight ancestors heavier than
    /// descendants (§4.6.2); LRU and A2Q ignore it. Every wrapper here has
    /// a positive in-use counter on entry, from being handed off to the
    /// caller; consuming the update is what decrements it back.
    pub fn update_access_metadata(&self, depth: usize, path: &[WrapperHandle<T>]) {
        let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
        for (i, handle) in path.iter().enumerate() {
            let depth_remaining = depth.saturating_sub(i) as u32;
            policy.touch_with_depth(handle.uid(), depth_remaining);
        }
        drop(policy);
        for handle in path {
            handle.clear_in_use();
        }
    }

    /// Pair overload (§4.6): a sibling and the node an operation actually
    /// affected, touched together — e.g. a rebalance that moves one key
    /// across adjacent leaves.
    pub fn update_access_metadata_pair(&self, depth: usize, sibling: &WrapperHandle<T>, affected: &WrapperHandle<T>) {
        self.update_access_metadata(depth, &[sibling.clone(), affected.clone()]);
    }

    /// Delete-triple overload (§4.6): `primary` and `affected_sibling` earn
    /// the usual recency touch, but `to_discard` is the node a merge just
    /// emptied out, so it's removed from the cache outright instead.
    pub fn update_access_metadata_delete(
        &self,
        depth: usize,
        primary: &WrapperHandle<T>,
        affected_sibling: &WrapperHandle<T>,
        to_discard: &WrapperHandle<T>,
    ) -> Result<()> {
        self.update_access_metadata(depth, &[primary.clone(), affected_sibling.clone()]);
        let uid = to_discard.uid();
        to_discard.clear_in_use();
        self.remove_object(uid)
    }

    /// Explicitly delete an object (§4.5). Resolves the redirect table
    /// first; if the object was persisted, frees its backing range.
    pub fn remove_object(&self, uid: Uid) -> Result<()> {
        let resolved = self.resolve_redirect(uid);
        let removed = self
            .policy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(resolved);
        let Some(handle) = removed else {
            return Err(CacheError::KeyDoesNotExist(uid));
        };
        self.dirty.lock().unwrap_or_else(|e| e.into_inner()).remove(&resolved);
        // A UID that was never flushed anywhere has nothing to free in a
        // backend; treat that as success rather than an error.
        match self.storage.remove(resolved) {
            Ok(()) | Err(CacheError::KeyDoesNotExist(_)) | Err(CacheError::Unsupported(_)) => {}
            Err(e) => return Err(e),
        }
        drop(handle);
        Ok(())
    }

    /// Number of wrappers currently resident, for
    /// `get_objects_count_in_cache` (§4.4).
    pub fn objects_count_in_cache(&self) -> usize {
        self.policy.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Force every dirty resident object out to its backend (§4.4, and
    /// the periodic call the background [`Flusher`] makes).
    pub fn flush_dirty(&self) -> Result<()> {
        let pending: Vec<Uid> = {
            let mut dirty = self.dirty.lock().unwrap_or_else(|e| e.into_inner());
            dirty.drain().collect()
        };
        for uid in pending {
            if let Err(e) = self.flush_one(uid) {
                warn!(target: "treecache::cache", "failed to flush {uid:?}: {e}");
                self.dirty.lock().unwrap_or_else(|e| e.into_inner()).insert(uid);
            }
        }
        self.storage.flush()
    }

    /// Flush a dirty resident object still tracked by the policy, re-keying
    /// the policy's index if writeback relocates it (§3: a relocation must
    /// not strand the policy's own bookkeeping on the old identity).
    fn flush_one(&self, uid: Uid) -> Result<()> {
        let resolved = self.resolve_redirect(uid);
        let handle = {
            let policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
            policy.get(resolved)
        };
        let Some(handle) = handle else {
            return Ok(());
        };
        if handle.lock().mark_delete {
            // Logically deleted; the eviction path reclaims it when the
            // policy gives it up as a victim. Writing it back here would
            // persist bytes that are about to be thrown away.
            return Ok(());
        }
        let new_uid = self.flush_handle(resolved, &handle)?;
        if new_uid != resolved {
            let mut policy = self.policy.lock().unwrap_or_else(|e| e.into_inner());
            policy.remove(resolved);
            policy.insert(handle);
        }
        Ok(())
    }

    /// Serialize and persist `handle`'s core object, updating its UID and
    /// the redirect table in place. Does not touch the policy's index —
    /// callers that still have the handle tracked there (ordinary
    /// [`Cache::flush_one`]) re-key it themselves; callers discarding the
    /// handle right after (eviction, via [`Cache::ensure_capacity`]) don't
    /// need to.
    fn flush_handle(&self, resolved: Uid, handle: &WrapperHandle<T>) -> Result<Uid> {
        let mut buf = Vec::new();
        let (hint, has_backend_copy) = {
            let state = handle.lock();
            let Some(object) = state.core_object.as_ref() else {
                return Ok(resolved);
            };
            let hint = object.serialize(&mut buf);
            // `Uid::is_persisted()` is about the File/PMem media; a
            // `Volatile`-medium UID can *still* already have a backend
            // copy if this isn't its first flush (a `VolatileBackend`
            // write carries the same medium tag). `uid_updated` being set
            // is the actual "has this been written before" signal.
            (hint, resolved.is_persisted() || state.uid_updated.is_some())
        };

        let new_uid = match (hint, has_backend_copy) {
            (InPlaceHint::SameRange, true) => match self.storage.overwrite(resolved, &buf)? {
                Some(uid) => uid,
                None => self.relocate(resolved, &buf)?,
            },
            _ if has_backend_copy => self.relocate(resolved, &buf)?,
            _ => self.storage.write(resolved.object_type(), &buf)?,
        };

        if new_uid != resolved {
            self.redirects.lock().unwrap_or_else(|e| e.into_inner()).insert(resolved, new_uid);
            self.policy
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .notify_relocated(resolved, new_uid);
            debug!(target: "treecache::cache", "relocated {resolved:?} -> {new_uid:?}");
        }

        let mut state = handle.lock();
        state.uid = new_uid;
        state.uid_updated = Some(new_uid);
        state.dirty = false;
        Ok(new_uid)
    }

    /// Write a fresh copy and free the old range. Only called once a
    /// backend copy is already known to exist, so a miss freeing it is
    /// never an error — just nothing left to reclaim.
    fn relocate(&self, old_uid: Uid, bytes: &[u8]) -> Result<Uid> {
        let new_uid = self.storage.write(old_uid.object_type(), bytes)?;
        match self.storage.remove(old_uid) {
            Ok(()) | Err(CacheError::KeyDoesNotExist(_)) | Err(CacheError::Unsupported(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(new_uid)
    }

    /// Evict down to `max_resident` if the cache has grown past it
    /// (§4.6). Dirty victims are flushed first so eviction never drops a
    /// write on the floor.
    fn ensure_capacity(&self) -> Result<()> {
        loop {
            let over_capacity = self.objects_count_in_cache() > self.max_resident;
            if !over_capacity {
                return Ok(());
            }
            let victim = self.policy.lock().unwrap_or_else(|e| e.into_inner()).evict_one();
            let Some(victim) = victim else {
                // Nothing evictable right now (everything's in use or has
                // dependents); stop rather than spin.
                return Ok(());
            };
            let uid = victim.uid();
            let (mark_delete, dirty) = {
                let state = victim.lock();
                (state.mark_delete, state.dirty)
            };
            if mark_delete {
                // §3 / §4.6.2 rule 4: a logically deleted wrapper gets its
                // persisted bytes reclaimed instead of written back.
                match self.storage.remove(uid) {
                    Ok(()) | Err(CacheError::KeyDoesNotExist(_)) | Err(CacheError::Unsupported(_)) => {}
                    Err(e) => return Err(e),
                }
            } else if dirty {
                // Already removed from the policy's index by `evict_one`;
                // flush the handle directly rather than through
                // `flush_one`, which expects to find it there.
                self.flush_handle(uid, &victim)?;
            }
            assert_not_mid_writeback(&victim.lock());
            discard_core(&victim);
        }
    }

    fn mark_dirty(&self, uid: Uid) {
        self.dirty.lock().unwrap_or_else(|e| e.into_inner()).insert(uid);
    }

    fn resolve_redirect(&self, mut uid: Uid) -> Uid {
        let mut redirects = self.redirects.lock().unwrap_or_else(|e| e.into_inner());
        // Chase the whole chain, not just one hop, and collapse it so a
        // later caller resolves in one lookup.
        let original = uid;
        while let Some(&next) = redirects.get(&uid) {
            uid = next;
        }
        if uid != original {
            redirects.remove(&original);
        }
        uid
    }
}
