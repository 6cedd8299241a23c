//! Persistent-memory-backed arena.
//!
//! Same record layout and allocator as [`crate::backend::file`], but backed
//! by an anonymous memory map rather than a file-backed one (grounded on
//! the `open_anon`-style pattern of mapping `MmapMut::map_anon` with no
//! file at all). There's no flusher thread here: PMem writes are
//! durable once the store instruction retires, so `flush` is a cheap
//! barrier rather than an I/O call (§4.8's rationale for why `PMEM` always
//! selects `enable_clock_with_buffer` instead of a write-behind queue).

use std::sync::Mutex;

use memmap2::MmapMut;
use xxhash_rust::xxh3::xxh3_64;

use crate::alloc::BitmapAllocator;
use crate::backend::{AccessCost, Backend};
use crate::error::{CacheError, Result};
use crate::uid::{ObjectType, StorageMedium, Uid};

const RECORD_HEADER_LEN: usize = 8;

struct PMemBackendInner {
    mmap: MmapMut,
    allocator: BitmapAllocator,
}

/// An anonymous-mapping arena standing in for a real PMem device.
///
/// Rust has no portable `clwb`/`sfence` intrinsics outside of nightly, so
/// this backend models PMem's contract (byte-addressable, no page-cache
/// layer, no background writeback) without claiming hardware persistence
/// it can't provide — see DESIGN.md for the Open Question this resolves.
pub struct PMemBackend {
    inner: Mutex<PMemBackendInner>,
}

impl PMemBackend {
    pub fn new(capacity_bytes: u64, block_size: u32) -> Result<Self> {
        let mmap = MmapMut::map_anon(capacity_bytes as usize).map_err(|e| CacheError::AllocFailed {
            requested: capacity_bytes as usize,
            source: e,
        })?;
        Ok(PMemBackend {
            inner: Mutex::new(PMemBackendInner {
                mmap,
                allocator: BitmapAllocator::new(block_size, capacity_bytes),
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PMemBackendInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for PMemBackend {
    fn medium(&self) -> StorageMedium {
        StorageMedium::PMem
    }

    fn read_bytes(&self, uid: Uid) -> Result<Vec<u8>> {
        let offset = uid
            .persistent_offset()
            .ok_or(CacheError::Unsupported("PMemBackend can only read persisted UIDs"))? as usize;
        let len = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("PMemBackend can only read persisted UIDs"))? as usize;
        let inner = self.lock();
        let region = inner
            .mmap
            .get(offset..offset + len)
            .ok_or(CacheError::InvalidAccess { offset, len })?;
        let stored_hash = u64::from_le_bytes(region[..RECORD_HEADER_LEN].try_into().unwrap());
        let payload = &region[RECORD_HEADER_LEN..];
        if xxh3_64(payload) != stored_hash {
            return Err(CacheError::HashFailed {
                offset,
                len: payload.len(),
            });
        }
        Ok(payload.to_vec())
    }

    fn write(&self, object_type: ObjectType, bytes: &[u8]) -> Result<Uid> {
        let total_len = (bytes.len() + RECORD_HEADER_LEN) as u32;
        let mut inner = self.lock();
        let offset = inner.allocator.allocate(total_len)?;
        write_record(&mut inner.mmap, offset as usize, bytes);
        Ok(Uid::from_persistent_offset(
            object_type,
            StorageMedium::PMem,
            offset,
            total_len,
        ))
    }

    fn overwrite(&self, uid: Uid, bytes: &[u8]) -> Result<Option<Uid>> {
        let offset = uid
            .persistent_offset()
            .ok_or(CacheError::Unsupported("PMemBackend can only overwrite persisted UIDs"))?;
        let capacity = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("PMemBackend can only overwrite persisted UIDs"))?;
        let needed = (bytes.len() + RECORD_HEADER_LEN) as u32;
        if needed > capacity {
            return Ok(None);
        }
        let mut inner = self.lock();
        write_record(&mut inner.mmap, offset as usize, bytes);
        Ok(Some(uid))
    }

    fn remove(&self, uid: Uid) -> Result<()> {
        let offset = uid
            .persistent_offset()
            .ok_or(CacheError::Unsupported("PMemBackend can only remove persisted UIDs"))?;
        let size = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("PMemBackend can only remove persisted UIDs"))?;
        let mut inner = self.lock();
        inner.allocator.free(offset, size);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Anonymous maps have nothing to synchronize to a file; this is a
        // barrier in name, matching PMem's store-is-already-durable model.
        Ok(())
    }

    fn access_cost(&self) -> AccessCost {
        AccessCost {
            read_cost: 0.2,
            write_cost: 0.3,
        }
    }
}

fn write_record(mmap: &mut MmapMut, offset: usize, bytes: &[u8]) {
    let hash = xxh3_64(bytes);
    let total = RECORD_HEADER_LEN + bytes.len();
    let region = &mut mmap[offset..offset + total];
    region[..RECORD_HEADER_LEN].copy_from_slice(&hash.to_le_bytes());
    region[RECORD_HEADER_LEN..].copy_from_slice(bytes);
}
