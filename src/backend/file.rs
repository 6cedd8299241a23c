//! File-backed persistent arena.
//!
//! Grounded on `storage.rs`'s `StorageInner` (`mmap`-backed arena,
//! `flush`/`flush_range`) and its xxhash record integrity check. Unlike
//! that design, the arena here has a fixed capacity decided at open
//! time — growth-by-remap is the one piece of dynamic resizing this
//! crate doesn't need, since the bitmap allocator already knows its
//! arena's exact size up front (see DESIGN.md).

use std::fs::{File, OpenOptions as StdOpenOptions};
use std::path::Path;
use std::sync::Mutex;

use fs4::fs_std::FileExt;
use memmap2::MmapMut;
use xxhash_rust::xxh3::xxh3_64;

use crate::alloc::BitmapAllocator;
use crate::backend::{AccessCost, Backend};
use crate::error::{CacheError, Result};
use crate::uid::{ObjectType, StorageMedium, Uid};

const RECORD_HEADER_LEN: usize = 8;

struct FileBackendInner {
    file: File,
    mmap: MmapMut,
    allocator: BitmapAllocator,
}

/// A persistent arena backed by a single memory-mapped file.
///
/// Each record is stored as an 8-byte little-endian xxh3-64 checksum
/// followed by the serialized payload; [`Backend::read`] rejects any
/// record whose checksum doesn't match (§7's `HashFailed`).
pub struct FileBackend {
    inner: Mutex<FileBackendInner>,
}

impl FileBackend {
    /// Open (creating if necessary) a file-backed arena of exactly
    /// `capacity_bytes`, allocated in `block_size`-byte units.
    pub fn open<P: AsRef<Path>>(path: P, capacity_bytes: u64, block_size: u32) -> Result<Self> {
        let file = StdOpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(CacheError::Open)?;
        file.try_lock_exclusive().map_err(CacheError::Lock)?;

        let current_len = file.metadata().map_err(CacheError::Open)?.len();
        if current_len < capacity_bytes {
            file.set_len(capacity_bytes)
                .map_err(|e| CacheError::ResizeFailed {
                    size: current_len as usize,
                    requested: capacity_bytes as usize,
                    source: e,
                })?;
            file.sync_all().map_err(CacheError::Sync)?;
        }

        let mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|e| CacheError::AllocFailed {
            requested: capacity_bytes as usize,
            source: e,
        })?;

        Ok(FileBackend {
            inner: Mutex::new(FileBackendInner {
                file,
                mmap,
                allocator: BitmapAllocator::new(block_size, capacity_bytes),
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileBackendInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for FileBackend {
    fn medium(&self) -> StorageMedium {
        StorageMedium::File
    }

    fn read_bytes(&self, uid: Uid) -> Result<Vec<u8>> {
        let offset = uid
            .persistent_offset()
            .ok_or(CacheError::Unsupported("FileBackend can only read persisted UIDs"))? as usize;
        let len = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("FileBackend can only read persisted UIDs"))? as usize;
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
            StorageMedium::File,
            offset,
            total_len,
        ))
    }

    fn overwrite(&self, uid: Uid, bytes: &[u8]) -> Result<Option<Uid>> {
        let offset = uid
            .persistent_offset()
            .ok_or(CacheError::Unsupported("FileBackend can only overwrite persisted UIDs"))?;
        let capacity = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("FileBackend can only overwrite persisted UIDs"))?;
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
            .ok_or(CacheError::Unsupported("FileBackend can only remove persisted UIDs"))?;
        let size = uid
            .persistent_size()
            .ok_or(CacheError::Unsupported("FileBackend can only remove persisted UIDs"))?;
        let mut inner = self.lock();
        inner.allocator.free(offset, size);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let inner = self.lock();
        inner.mmap.flush().map_err(CacheError::Sync)?;
        inner.file.sync_all().map_err(CacheError::Sync)
    }

    fn access_cost(&self) -> AccessCost {
        AccessCost {
            read_cost: 1.0,
            write_cost: 2.0,
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("arena.bin"), 1 << 20, 64).unwrap();
        let uid = backend.write(2, b"tree node bytes").unwrap();
        let bytes = backend.read_bytes(uid).unwrap();
        assert_eq!(bytes, b"tree node bytes");
    }

    #[test]
    fn overwrite_in_place_when_it_fits() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("arena.bin"), 1 << 20, 64).unwrap();
        let uid = backend.write(2, b"short").unwrap();
        let same = backend.overwrite(uid, b"still fits").unwrap();
        assert_eq!(same, Some(uid));
        let bytes = backend.read_bytes(uid).unwrap();
        assert_eq!(bytes, b"still fits");
    }

    #[test]
    fn corrupted_record_fails_hash_check() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("arena.bin"), 1 << 20, 64).unwrap();
        let uid = backend.write(2, b"hello").unwrap();
        {
            let mut inner = backend.lock();
            let offset = uid.persistent_offset().unwrap() as usize;
            inner.mmap[offset] ^= 0xff;
        }
        assert!(matches!(
            backend.read_bytes(uid),
            Err(CacheError::HashFailed { .. })
        ));
    }
}
