//! Pure in-memory backend: no file, no persistence, used when the
//! device-aware selector picks `StorageDeviceType::Volatile` for a node
//! type (§4.8) or when a test wants a backend with no filesystem
//! footprint at all.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::backend::{AccessCost, Backend};
use crate::error::{CacheError, Result};
use crate::uid::{ObjectType, StorageMedium, TokenMint, Uid};

/// An in-memory arena keyed by minted tokens rather than byte offsets.
/// There's no allocator here in the bitmap sense — each entry just owns
/// its `Vec<u8>` — because nothing needs to be laid out contiguously for
/// mmap or file I/O.
pub struct VolatileBackend {
    mint: TokenMint,
    entries: Mutex<HashMap<u64, (ObjectType, Vec<u8>)>>,
}

impl VolatileBackend {
    pub fn new() -> Self {
        VolatileBackend {
            // Disjoint from a `Cache`'s own not-yet-persisted token range
            // (see `TokenMint::starting_at`), so a freshly created object's
            // UID can never collide with one this backend has written.
            mint: TokenMint::starting_at(1u64 << 63),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for VolatileBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for VolatileBackend {
    fn medium(&self) -> StorageMedium {
        StorageMedium::Volatile
    }

    fn read_bytes(&self, uid: Uid) -> Result<Vec<u8>> {
        let token = uid
            .volatile_token()
            .ok_or(CacheError::Unsupported("VolatileBackend can only read volatile UIDs"))?;
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let (_, bytes) = entries
            .get(&token)
            .ok_or(CacheError::KeyDoesNotExist(uid))?;
        Ok(bytes.clone())
    }

    fn write(&self, object_type: ObjectType, bytes: &[u8]) -> Result<Uid> {
        let token = self.mint.mint();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(token, (object_type, bytes.to_vec()));
        Ok(Uid::from_volatile_pointer(object_type, token))
    }

    fn overwrite(&self, uid: Uid, bytes: &[u8]) -> Result<Option<Uid>> {
        let token = uid
            .volatile_token()
            .ok_or(CacheError::Unsupported("VolatileBackend can only overwrite volatile UIDs"))?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(&token) {
            Some((_, existing)) => {
                existing.clear();
                existing.extend_from_slice(bytes);
                Ok(Some(uid))
            }
            None => Err(CacheError::KeyDoesNotExist(uid)),
        }
    }

    fn remove(&self, uid: Uid) -> Result<()> {
        let token = uid
            .volatile_token()
            .ok_or(CacheError::Unsupported("VolatileBackend can only remove volatile UIDs"))?;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .remove(&token)
            .map(|_| ())
            .ok_or(CacheError::KeyDoesNotExist(uid))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn access_cost(&self) -> AccessCost {
        AccessCost::ZERO
    }
}
