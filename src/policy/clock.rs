//! CLOCK (second-chance) policy with a weighted reference count (§4.6.2).
//!
//! Grounded on `CLOCKCache.hpp`: a circular buffer of slots and a sweeping
//! hand, except the binary reference bit is generalized to a small
//! weight counter (`m_vtClockBufferWeight`) so the
//! `enable_clock_with_buffer` build config (selected for PMem workloads,
//! §4.8) gets extra second chances before eviction instead of exactly
//! one. A plain [`CachePolicy::touch`] sets that weight to
//! `max_weight + 1`; an `update_objects_access_metadata` touch instead
//! carries how far the touched wrapper sits from the leaf along the
//! access path and sets the weight to that depth directly, so the hand
//! passes over an ancestor more times than it does a descendant before
//! either one gives up its slot. Eviction also honors `mark_delete`: a
//! wrapper the tree has logically deleted is evictable regardless of
//! dependents, and the cache reclaims its persisted bytes instead of
//! writing it back.

use std::collections::HashMap;

use crate::object::{CoreObject, WrapperHandle};
use crate::policy::{evictable, CachePolicy, SlotIndex};
use crate::uid::Uid;

struct Node<T: CoreObject> {
    handle: WrapperHandle<T>,
    weight: u8,
}

/// `max_weight` of `0` reproduces plain reference-bit CLOCK; anything
/// higher is the "with buffer" variant the selector picks for PMem
/// (§4.8).
pub struct ClockPolicy<T: CoreObject> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<SlotIndex>,
    index: HashMap<Uid, SlotIndex>,
    hand: SlotIndex,
    len: usize,
    max_weight: u8,
}

impl<T: CoreObject> ClockPolicy<T> {
    pub fn new(max_weight: u8) -> Self {
        ClockPolicy {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            hand: 0,
            len: 0,
            max_weight,
        }
    }

    fn advance_hand(&mut self) {
        if self.slots.is_empty() {
            self.hand = 0;
        } else {
            self.hand = (self.hand + 1) % self.slots.len();
        }
    }
}

impl<T: CoreObject> Default for ClockPolicy<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: CoreObject> CachePolicy<T> for ClockPolicy<T> {
    fn insert(&mut self, handle: WrapperHandle<T>) {
        let uid = handle.uid();
        // A freshly inserted slot starts with no reference weight — it
        // only earns a second chance once something actually touches it
        // again, same as a page fault handler clearing the reference bit
        // on first map.
        let node = Node { handle, weight: 0 };
        let slot = if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            slot
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        };
        self.index.insert(uid, slot);
        self.len += 1;
    }

    fn touch(&mut self, uid: Uid) {
        let base_weight = self.max_weight.saturating_add(1);
        if let Some(&slot) = self.index.get(&uid) {
            if let Some(node) = self.slots[slot].as_mut() {
                node.weight = base_weight;
            }
        }
    }

    /// §4.6.2's metadata-update rule: weight becomes `depth_remaining`
    /// directly rather than the flat `max_weight + 1` a plain hit gets, so
    /// an interior node near the root survives more hand passes than a
    /// leaf a full tree-height below it.
    fn touch_with_depth(&mut self, uid: Uid, depth_remaining: u32) {
        if let Some(&slot) = self.index.get(&uid) {
            if let Some(node) = self.slots[slot].as_mut() {
                node.weight = depth_remaining.min(u8::MAX as u32) as u8;
            }
        }
    }

    fn remove(&mut self, uid: Uid) -> Option<WrapperHandle<T>> {
        let slot = self.index.remove(&uid)?;
        let node = self.slots[slot].take().unwrap();
        self.free.push(slot);
        self.len -= 1;
        Some(node.handle)
    }

    fn evict_one(&mut self) -> Option<WrapperHandle<T>> {
        if self.slots.is_empty() {
            return None;
        }
        let max_rounds = self.slots.len() * (self.max_weight as usize + 2);
        for _ in 0..max_rounds {
            let slot = self.hand;
            let occupied = self.slots[slot].is_some();
            if !occupied {
                self.advance_hand();
                continue;
            }
            let weight = self.slots[slot].as_ref().unwrap().weight;
            if weight > 0 {
                self.slots[slot].as_mut().unwrap().weight -= 1;
                self.advance_hand();
                continue;
            }
            let handle = self.slots[slot].as_ref().unwrap().handle.clone();
            // `evictable` already honors rule 4's `mark_delete` override: a
            // logically deleted wrapper skips the dependents check. Freeing
            // its persisted bytes is the façade's job (it owns the backend
            // handle), done right after this slot is handed back.
            if evictable(&handle) {
                let uid = handle.uid();
                self.index.remove(&uid);
                self.slots[slot] = None;
                self.free.push(slot);
                self.len -= 1;
                self.advance_hand();
                return Some(handle);
            }
            // In use or has dependents: give it one more lease of life so
            // the hand doesn't spin on it forever.
            self.slots[slot].as_mut().unwrap().weight = 1;
            self.advance_hand();
        }
        None
    }

    fn contains(&self, uid: Uid) -> bool {
        self.index.contains_key(&uid)
    }

    fn get(&self, uid: Uid) -> Option<WrapperHandle<T>> {
        let slot = *self.index.get(&uid)?;
        self.slots[slot].as_ref().map(|n| n.handle.clone())
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;
    impl CoreObject for Leaf {
        fn object_type(&self) -> crate::uid::ObjectType {
            1
        }
        fn serialize(&self, buf: &mut Vec<u8>) -> crate::object::InPlaceHint {
            buf.clear();
            crate::object::InPlaceHint::Fresh
        }
        fn deserialize(_bytes: &[u8], _object_type: crate::uid::ObjectType) -> crate::error::Result<Self> {
            Ok(Leaf)
        }
    }

    fn uid(token: u64) -> Uid {
        Uid::from_volatile_pointer(1, token)
    }

    #[test]
    fn unreferenced_slot_is_evicted_on_first_sweep() {
        let mut p: ClockPolicy<Leaf> = ClockPolicy::new(0);
        p.insert(WrapperHandle::new(uid(1), Leaf));
        p.insert(WrapperHandle::new(uid(2), Leaf));
        let victim = p.evict_one().unwrap();
        assert_eq!(victim.uid(), uid(1));
    }

    #[test]
    fn touched_slot_survives_one_sweep() {
        let mut p: ClockPolicy<Leaf> = ClockPolicy::new(0);
        p.insert(WrapperHandle::new(uid(1), Leaf));
        p.touch(uid(1));
        p.insert(WrapperHandle::new(uid(2), Leaf));
        let victim = p.evict_one().unwrap();
        assert_eq!(victim.uid(), uid(2));
        assert!(p.contains(uid(1)));
    }

    #[test]
    fn sole_candidate_is_eventually_evicted_despite_buffered_weight() {
        let mut p: ClockPolicy<Leaf> = ClockPolicy::new(2);
        p.insert(WrapperHandle::new(uid(1), Leaf));
        let victim = p.evict_one().unwrap();
        assert_eq!(victim.uid(), uid(1));
        assert_eq!(p.len(), 0);
    }
}
