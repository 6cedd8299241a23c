//! Property and end-to-end scenario tests for the buffer-pool cache (§8).
//!
//! Each invariant test is proptest-driven where the property is about a
//! range of inputs; the scenarios (S1-S6) are fixed, deterministic
//! walkthroughs at capacity 4 / block-size 4096, favoring small literal
//! arenas over randomized ones for the cases that need exact offsets.

use proptest::prelude::*;

use treecache::alloc::BitmapAllocator;
use treecache::policy::a2q::A2QPolicy;
use treecache::policy::clock::ClockPolicy;
use treecache::policy::lru::LruPolicy;
use treecache::policy::CachePolicy;
use treecache::{
    select_policy, CacheBuilder, CoreObject, InPlaceHint, ObjectType, StorageDeviceType, Uid,
    WorkloadType, WrapperHandle,
};

const INDEX_TYPE: ObjectType = 1;
const DATA_TYPE: ObjectType = 2;

/// A minimal stand-in for a B+-tree node: enough to exercise the
/// serialization boundary and the router's type-tag dispatch without
/// pulling in real key/value comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Index { id: u64, children: Vec<u8> },
    Leaf { id: u64, payload: Vec<u8> },
}

impl Node {
    fn leaf(id: u64, payload: Vec<u8>) -> Self {
        Node::Leaf { id, payload }
    }
    fn index(id: u64, children: Vec<u8>) -> Self {
        Node::Index { id, children }
    }
}

impl CoreObject for Node {
    fn object_type(&self) -> ObjectType {
        match self {
            Node::Index { .. } => INDEX_TYPE,
            Node::Leaf { .. } => DATA_TYPE,
        }
    }

    fn serialize(&self, buf: &mut Vec<u8>) -> InPlaceHint {
        buf.clear();
        let (id, rest) = match self {
            Node::Index { id, children } => (*id, children),
            Node::Leaf { id, payload } => (*id, payload),
        };
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(rest);
        InPlaceHint::Fresh
    }

    fn deserialize(bytes: &[u8], object_type: ObjectType) -> treecache::Result<Self> {
        let id = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let rest = bytes[8..].to_vec();
        Ok(if object_type == INDEX_TYPE {
            Node::Index { id, children: rest }
        } else {
            Node::Leaf { id, payload: rest }
        })
    }
}

/// A node type whose dependent-ness is controlled directly, for invariant
/// 6. A real interior node would report this based on whether it still
/// holds a volatile pointer to an unflushed child; here it's just a flag.
struct Dependent {
    id: u64,
    has_dependent: bool,
}

impl CoreObject for Dependent {
    fn object_type(&self) -> ObjectType {
        DATA_TYPE
    }
    fn serialize(&self, buf: &mut Vec<u8>) -> InPlaceHint {
        buf.clear();
        buf.extend_from_slice(&self.id.to_le_bytes());
        InPlaceHint::Fresh
    }
    fn deserialize(bytes: &[u8], _object_type: ObjectType) -> treecache::Result<Self> {
        Ok(Dependent {
            id: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            has_dependent: false,
        })
    }
    fn have_dependents_in_cache(&self) -> bool {
        self.has_dependent
    }
}

fn lru_config() -> treecache::PolicyConfig {
    select_policy(WorkloadType::YcsbB, StorageDeviceType::Volatile)
}
fn clock_config() -> treecache::PolicyConfig {
    select_policy(WorkloadType::YcsbF, StorageDeviceType::Volatile)
}

fn uid(token: u64) -> Uid {
    Uid::from_volatile_pointer(DATA_TYPE, token)
}

// ---------------------------------------------------------------------
// Invariant 1: residency bound.
// ---------------------------------------------------------------------

proptest! {
    #[test]
    fn invariant_1_residency_bound(num_creates in 1usize..40) {
        let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
            .max_resident(4)
            .policy(lru_config())
            .open_anon::<Node>()
            .unwrap();
        for i in 0..num_creates {
            cache.create_object(Node::leaf(i as u64, vec![i as u8])).unwrap();
        }
        prop_assert!(cache.objects_count_in_cache() <= 4);
    }
}

// ---------------------------------------------------------------------
// Invariant 2: bitmap consistency. Tracks expected used-block count
// independently and checks it against `available_blocks()` after every
// op, which is the public-API equivalent of the internal
// popcount(bitmap) == total_blocks - available_blocks identity.
// ---------------------------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum AllocOp {
    Alloc(u32),
    Free(u32),
}

fn alloc_op_strategy() -> impl Strategy<Value = AllocOp> {
    prop_oneof![
        prop::sample::select(vec![1u32, 2, 4, 8]).prop_map(AllocOp::Alloc),
        any::<u32>().prop_map(AllocOp::Free),
    ]
}

proptest! {
    #[test]
    fn invariant_2_bitmap_consistency(ops in prop::collection::vec(alloc_op_strategy(), 1..60)) {
        const BLOCK_SIZE: u32 = 64;
        let mut allocator = BitmapAllocator::new(BLOCK_SIZE, BLOCK_SIZE as u64 * 256);
        let mut live: Vec<(u64, u32)> = Vec::new();
        let mut used_blocks: u32 = 0;

        for op in ops {
            match op {
                AllocOp::Alloc(mult) => {
                    let bytes = BLOCK_SIZE * mult;
                    if let Ok(offset) = allocator.allocate(bytes) {
                        used_blocks += mult;
                        live.push((offset, bytes));
                    }
                }
                AllocOp::Free(raw) => {
                    if !live.is_empty() {
                        let idx = (raw as usize) % live.len();
                        let (offset, bytes) = live.remove(idx);
                        used_blocks -= bytes / BLOCK_SIZE;
                        allocator.free(offset, bytes);
                    }
                }
            }
            prop_assert_eq!(allocator.available_blocks(), allocator.total_blocks() - used_blocks);
        }
    }
}

// ---------------------------------------------------------------------
// Invariant 3: UID-medium consistency. Every live allocation's byte range
// lies fully inside the arena and overlaps no other live allocation's
// range.
// ---------------------------------------------------------------------

proptest! {
    #[test]
    fn invariant_3_uid_medium_consistency(ops in prop::collection::vec(alloc_op_strategy(), 1..60)) {
        const BLOCK_SIZE: u32 = 64;
        const ARENA_BLOCKS: u64 = 256;
        let mut allocator = BitmapAllocator::new(BLOCK_SIZE, BLOCK_SIZE as u64 * ARENA_BLOCKS);
        let mut live: Vec<(u64, u32)> = Vec::new();

        for op in ops {
            match op {
                AllocOp::Alloc(mult) => {
                    let bytes = BLOCK_SIZE * mult;
                    if let Ok(offset) = allocator.allocate(bytes) {
                        prop_assert!(offset + bytes as u64 <= BLOCK_SIZE as u64 * ARENA_BLOCKS);
                        for &(other_offset, other_bytes) in &live {
                            let a_end = offset + bytes as u64;
                            let b_end = other_offset + other_bytes as u64;
                            let disjoint = a_end <= other_offset || b_end <= offset;
                            prop_assert!(disjoint, "new range [{offset}, {a_end}) overlaps live range [{other_offset}, {b_end})");
                        }
                        live.push((offset, bytes));
                    }
                }
                AllocOp::Free(raw) => {
                    if !live.is_empty() {
                        let idx = (raw as usize) % live.len();
                        let (offset, bytes) = live.remove(idx);
                        allocator.free(offset, bytes);
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// Invariant 4: round trip. create -> dirty -> evict-via-capacity-pressure
// -> get returns the original bytes.
// ---------------------------------------------------------------------

proptest! {
    #[test]
    fn invariant_4_round_trip_survives_capacity_eviction(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
            .max_resident(2)
            .policy(lru_config())
            .open_anon::<Node>()
            .unwrap();

        let handle = cache.create_object(Node::leaf(42, payload.clone())).unwrap();
        let original_uid = handle.uid();
        drop(handle);

        // Two more creates push the resident count to 3 > max_resident(2),
        // forcing the LRU tail (the id-42 object, never touched again) out.
        cache.create_object(Node::leaf(1, vec![])).unwrap();
        cache.create_object(Node::leaf(2, vec![])).unwrap();

        let refetched = cache.get_object(original_uid).unwrap();
        let state = refetched.lock();
        match state.core_object.as_ref().unwrap() {
            Node::Leaf { id, payload: p } => {
                prop_assert_eq!(*id, 42);
                prop_assert_eq!(p, &payload);
            }
            other => prop_assert!(false, "expected a leaf, got {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------
// Invariant 5: idempotent metadata update. Touching a resident object
// twice in a row must leave the policy in the same state as touching it
// once; clearing the in-use counter must exactly undo marking it.
// ---------------------------------------------------------------------

#[test]
fn invariant_5_idempotent_touch_on_lru() {
    fn build_and_touch(times: usize) -> Vec<Uid> {
        let mut policy: LruPolicy<Node> = LruPolicy::new();
        let ids: Vec<Uid> = (1..=3).map(uid).collect();
        for (i, &id) in ids.iter().enumerate() {
            policy.insert(WrapperHandle::new(id, Node::leaf(i as u64, vec![])));
        }
        for _ in 0..times {
            policy.touch(ids[0]);
        }
        let mut order = Vec::new();
        while let Some(victim) = policy.evict_one() {
            order.push(victim.uid());
        }
        order
    }

    assert_eq!(build_and_touch(1), build_and_touch(2));
}

#[test]
fn invariant_5_in_use_counter_restored_symmetrically() {
    let handle = WrapperHandle::new(uid(1), Node::leaf(1, vec![]));
    handle.mark_in_use();
    handle.mark_in_use();
    handle.clear_in_use();
    handle.clear_in_use();
    assert!(!handle.in_use());
    assert_eq!(handle.in_use_count(), 0);
}

// ---------------------------------------------------------------------
// Invariant 6: dependent safety. A wrapper reporting live in-cache
// dependents is never chosen for eviction.
// ---------------------------------------------------------------------

#[test]
fn invariant_6_dependent_wrapper_is_never_evicted() {
    let mut policy: LruPolicy<Dependent> = LruPolicy::new();
    let dependent_uid = uid(1);
    let plain_uid = uid(2);
    policy.insert(WrapperHandle::new(
        dependent_uid,
        Dependent { id: 1, has_dependent: true },
    ));
    policy.insert(WrapperHandle::new(
        plain_uid,
        Dependent { id: 2, has_dependent: false },
    ));

    let victim = policy.evict_one().unwrap();
    assert_eq!(victim.uid(), plain_uid);
    assert!(policy.contains(dependent_uid));
    // Nothing left that's safe to evict.
    assert!(policy.evict_one().is_none());
}

// ---------------------------------------------------------------------
// Invariant 7: ghost-queue adaptivity (A2Q). A second access shortly
// after eviction is shielded from the eviction pressure that targets
// first-time (OTA) arrivals, instead of restarting at the back of the
// line, and the MTA ratio `r` decreases monotonically under repeated
// ghost hits.
// ---------------------------------------------------------------------

#[test]
fn invariant_7_ghost_hit_shields_reentry_from_ota_pressure() {
    let mut policy: A2QPolicy<Node> = A2QPolicy::new(12, 12);
    let returning_uid = uid(1);
    policy.insert(WrapperHandle::new(returning_uid, Node::leaf(1, vec![])));
    policy.insert(WrapperHandle::new(uid(2), Node::leaf(2, vec![])));

    // MTA is empty, so eviction drains OTA FIFO-first, evicting
    // `returning_uid` and remembering it as a ghost.
    let victim = policy.evict_one().unwrap();
    assert_eq!(victim.uid(), returning_uid);

    // A repeat access shortly after: re-admitting the same identity is a
    // ghost hit, promoting straight into the protected queue.
    policy.insert(WrapperHandle::new(returning_uid, Node::leaf(1, vec![])));
    assert!(policy.contains(returning_uid));

    // Flood OTA with fresh, never-seen keys and keep evicting: the
    // ghost-promoted entry should survive while the fresh arrivals drain.
    for i in 10..15 {
        policy.insert(WrapperHandle::new(uid(i), Node::leaf(i, vec![])));
    }
    for _ in 0..5 {
        policy.evict_one();
    }
    assert!(
        policy.contains(returning_uid),
        "ghost-promoted entry should be shielded while fresh OTA arrivals drain first"
    );
}

#[test]
fn invariant_7_ratio_shrinks_monotonically_under_repeated_ghost_hits() {
    const CAPACITY: usize = 12;
    let mut policy: A2QPolicy<Node> = A2QPolicy::new(CAPACITY, CAPACITY);
    let mut ratios = vec![policy.mta_ratio()];

    // Each round: a fresh key enters OTA, gets evicted (OTA is always the
    // smaller, lower-utility queue here since it never holds more than
    // one entry), then an immediate re-admission is a ghost hit. This
    // repeatedly exercises the shrink path without ever evicting from MTA
    // (which would grow the ratio back), so the sequence is non-increasing.
    for round in 0..5u64 {
        let key = uid(100 + round);
        policy.insert(WrapperHandle::new(key, Node::leaf(round, vec![])));
        let victim = policy.evict_one().unwrap();
        assert_eq!(victim.uid(), key);
        policy.insert(WrapperHandle::new(key, Node::leaf(round, vec![])));
        ratios.push(policy.mta_ratio());
    }

    for pair in ratios.windows(2) {
        assert!(pair[1] <= pair[0], "MTA ratio must not increase on a ghost hit: {ratios:?}");
    }
    assert!(ratios.last().unwrap() < &(1.0 / 3.0), "ratio should have shrunk from its initial 1/3");
    assert!(*ratios.last().unwrap() >= 1.0 / CAPACITY as f64 - 1e-9);
}

// ---------------------------------------------------------------------
// Scenarios S1-S6. Each seeded with capacity 4 (block-size 4096 where a
// real backend is involved).
// ---------------------------------------------------------------------

#[test]
fn s1_lru_basic_eviction_and_redirect_resolution() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(4)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let h1 = cache.create_object(Node::leaf(1, vec![1])).unwrap();
    let k1 = h1.uid();
    drop(h1);
    cache.create_object(Node::leaf(2, vec![2])).unwrap();
    cache.create_object(Node::leaf(3, vec![3])).unwrap();
    cache.create_object(Node::leaf(4, vec![4])).unwrap();
    assert_eq!(cache.objects_count_in_cache(), 4);

    // Fifth create pushes the count to 5 > 4, evicting k1 (oldest,
    // never touched again).
    cache.create_object(Node::leaf(5, vec![5])).unwrap();
    assert_eq!(cache.objects_count_in_cache(), 4);

    let refetched = cache.get_object(k1).unwrap();
    match refetched.lock().core_object.as_ref().unwrap() {
        Node::Leaf { id, .. } => assert_eq!(*id, 1),
        other => panic!("expected a leaf, got {other:?}"),
    }
}

#[test]
fn s2_clock_second_chance() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(4)
        .policy(clock_config())
        .open_anon::<Node>()
        .unwrap();

    let h1 = cache.create_object(Node::leaf(1, vec![])).unwrap();
    let k1 = h1.uid();
    drop(h1);
    let h2 = cache.create_object(Node::leaf(2, vec![])).unwrap();
    let k2 = h2.uid();
    drop(h2);
    cache.create_object(Node::leaf(3, vec![])).unwrap();
    cache.create_object(Node::leaf(4, vec![])).unwrap();

    // Touch k1 again before the fifth insert: it earns a second chance
    // and survives this sweep, at k2's expense.
    cache.get_object(k1).unwrap();

    cache.create_object(Node::leaf(5, vec![])).unwrap();
    assert_eq!(cache.objects_count_in_cache(), 4);

    assert!(cache.get_object(k1).is_ok());
    // k2 was the one evicted; fetching it by its pre-eviction UID still
    // round-trips through the redirect table and a fresh backend read.
    let refetched_k2 = cache.get_object(k2).unwrap();
    match refetched_k2.lock().core_object.as_ref().unwrap() {
        Node::Leaf { id, .. } => assert_eq!(*id, 2),
        other => panic!("expected a leaf, got {other:?}"),
    }
}

#[test]
fn s3_a2q_promotion_on_ghost_hit() {
    // See invariant_7 for the end-to-end-equivalent walkthrough at the
    // policy layer; this scenario checks the same promotion rule via the
    // policy's public queue-membership behavior instead of internal
    // field access.
    let mut policy: A2QPolicy<Node> = A2QPolicy::new(4, 8);
    let a = uid(1);
    let b = uid(2);
    let c = uid(3);
    policy.insert(WrapperHandle::new(a, Node::leaf(1, vec![])));
    policy.insert(WrapperHandle::new(b, Node::leaf(2, vec![])));
    policy.insert(WrapperHandle::new(c, Node::leaf(3, vec![])));

    // MTA is still empty, so eviction drains OTA FIFO-first: `a` (oldest)
    // is evicted.
    let victim = policy.evict_one().unwrap();
    assert_eq!(victim.uid(), a);

    // Re-admitting `a` now promotes it directly into the protected queue.
    policy.insert(WrapperHandle::new(a, Node::leaf(1, vec![])));
    // touch() on a freshly-promoted Mta entry is a no-op structurally, but
    // confirms `a` is tracked as resident and not stuck in OTA.
    policy.touch(a);
    assert!(policy.contains(a));
}

#[test]
fn s4_dirty_writeback_relocates_and_clears_dirty_flag() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(4)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let handle = cache.create_object(Node::leaf(7, b"payload".to_vec())).unwrap();
    assert!(handle.lock().dirty);

    cache.flush_dirty().unwrap();

    assert!(!handle.lock().dirty);
    let current_uid = handle.uid();
    assert!(current_uid.is_persisted() || current_uid.volatile_token().is_some());

    // The now-current UID still resolves through the cache (still
    // resident, dirty flag cleared) and reads back the right payload.
    let refetched = cache.get_object(current_uid).unwrap();
    match refetched.lock().core_object.as_ref().unwrap() {
        Node::Leaf { id, payload } => {
            assert_eq!(*id, 7);
            assert_eq!(payload, b"payload");
        }
        other => panic!("expected a leaf, got {other:?}"),
    }
}

#[test]
fn s5_allocator_packing_reuses_freed_offset() {
    const BLOCK_SIZE: u32 = 4096;
    let mut allocator = BitmapAllocator::new(BLOCK_SIZE, BLOCK_SIZE as u64 * 64);

    let a = allocator.allocate(1000).unwrap(); // rounds to 1 block
    let b = allocator.allocate(8000).unwrap(); // rounds to 2 blocks
    let c = allocator.allocate(1000).unwrap(); // rounds to 1 block
    let d = allocator.allocate(8000).unwrap(); // rounds to 2 blocks

    assert_eq!(a, 0);
    assert_eq!(b, BLOCK_SIZE as u64);
    assert_eq!(c, BLOCK_SIZE as u64 * 3);
    assert_eq!(d, BLOCK_SIZE as u64 * 4);

    allocator.free(b, 8000);
    let reused = allocator.allocate(8000).unwrap();
    assert_eq!(reused, b);
}

#[test]
fn s6_router_dispatches_by_object_type() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(4)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let index_handle = cache.create_object(Node::index(1, vec![1, 2, 3])).unwrap();
    let data_handle = cache.create_object(Node::leaf(2, vec![4, 5, 6])).unwrap();
    cache.flush_dirty().unwrap();

    let index_uid = index_handle.uid();
    let data_uid = data_handle.uid();
    assert_eq!(index_uid.object_type(), INDEX_TYPE);
    assert_eq!(data_uid.object_type(), DATA_TYPE);

    let reread_index = cache.get_object(index_uid).unwrap();
    let reread_data = cache.get_object(data_uid).unwrap();
    match reread_index.lock().core_object.as_ref().unwrap() {
        Node::Index { id, .. } => assert_eq!(*id, 1),
        other => panic!("expected an index node, got {other:?}"),
    }
    match reread_data.lock().core_object.as_ref().unwrap() {
        Node::Leaf { id, .. } => assert_eq!(*id, 2),
        other => panic!("expected a leaf, got {other:?}"),
    }
}

#[test]
fn access_metadata_flat_list_touches_and_clears_in_use() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(10)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let root = cache.create_object(Node::index(1, vec![])).unwrap();
    let leaf = cache.create_object(Node::leaf(2, vec![])).unwrap();
    root.mark_in_use();
    leaf.mark_in_use();

    cache.update_access_metadata(2, &[root.clone(), leaf.clone()]);

    assert!(!root.in_use());
    assert!(!leaf.in_use());
}

#[test]
fn access_metadata_pair_touches_both_and_clears_in_use() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(10)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let sibling = cache.create_object(Node::leaf(1, vec![])).unwrap();
    let affected = cache.create_object(Node::leaf(2, vec![])).unwrap();
    sibling.mark_in_use();
    affected.mark_in_use();

    cache.update_access_metadata_pair(2, &sibling, &affected);

    assert!(!sibling.in_use());
    assert!(!affected.in_use());
}

#[test]
fn access_metadata_delete_triple_discards_the_third_wrapper() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(10)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let primary = cache.create_object(Node::leaf(1, vec![])).unwrap();
    let affected_sibling = cache.create_object(Node::leaf(2, vec![])).unwrap();
    let to_discard = cache.create_object(Node::leaf(3, vec![])).unwrap();
    let discard_uid = to_discard.uid();
    primary.mark_in_use();
    affected_sibling.mark_in_use();
    to_discard.mark_in_use();

    cache
        .update_access_metadata_delete(2, &primary, &affected_sibling, &to_discard)
        .unwrap();

    assert!(!primary.in_use());
    assert!(!affected_sibling.in_use());
    assert_eq!(cache.objects_count_in_cache(), 2);
    assert!(cache.get_object(discard_uid).is_err());
}

#[test]
fn access_metadata_weights_clock_slots_by_depth_remaining() {
    // A touch carrying depth weights the root (depth_remaining 3) to
    // outlast a leaf three levels below it (depth_remaining 1) under
    // CLOCK, even though both were inserted at the same time.
    let mut policy: ClockPolicy<Node> = ClockPolicy::new(0);
    let root = uid(1);
    let leaf = uid(2);
    policy.insert(WrapperHandle::new(root, Node::index(1, vec![])));
    policy.insert(WrapperHandle::new(leaf, Node::leaf(2, vec![])));

    policy.touch_with_depth(root, 3);
    policy.touch_with_depth(leaf, 1);

    let victim = policy.evict_one().unwrap();
    assert_eq!(victim.uid(), leaf);
    assert!(policy.contains(root));
}

#[test]
fn mark_for_deletion_reclaims_backend_bytes_instead_of_writing_back() {
    let cache = CacheBuilder::new(INDEX_TYPE, DATA_TYPE)
        .max_resident(1)
        .policy(lru_config())
        .open_anon::<Node>()
        .unwrap();

    let handle = cache.create_object(Node::leaf(9, b"gone".to_vec())).unwrap();
    cache.flush_dirty().unwrap();
    let persisted_uid = handle.uid();
    handle.mark_for_deletion();
    drop(handle);

    // Forces eviction of the marked wrapper; it should be reclaimed from
    // the backend rather than flushed.
    cache.create_object(Node::leaf(10, vec![])).unwrap();

    assert!(cache.get_object(persisted_uid).is_err());
}
