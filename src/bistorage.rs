//! Two-tier storage router (§4.3, §4.8).
//!
//! Grounded on `BiStorage.hpp`: a primary backend for one object type and
//! a secondary backend for another, dispatched purely on
//! `Uid::object_type()` — no side table, no per-call configuration. Cost
//! tracking (`getAccessCost`) is carried forward as a running average per
//! route, exposed for diagnostics and for the device-aware selector's
//! `build_config` reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::{AccessCost, Backend};
use crate::error::Result;
use crate::uid::{ObjectType, Uid};

#[derive(Default)]
struct RunningCost {
    reads: AtomicU64,
    writes: AtomicU64,
}

impl RunningCost {
    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }
    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Routes objects to one of two backends by their object-type tag.
///
/// `index_node_type` and `data_node_type` name which tag goes to
/// `primary` and which goes to `secondary` respectively, mirroring the
/// original's `Traits::IndexNodeUID` / `Traits::DataNodeUID` dispatch.
pub struct BiStorage {
    index_node_type: ObjectType,
    data_node_type: ObjectType,
    primary: Arc<dyn Backend>,
    secondary: Arc<dyn Backend>,
    primary_cost: RunningCost,
    secondary_cost: RunningCost,
}

impl BiStorage {
    pub fn new(
        index_node_type: ObjectType,
        data_node_type: ObjectType,
        primary: Arc<dyn Backend>,
        secondary: Arc<dyn Backend>,
    ) -> Self {
        BiStorage {
            index_node_type,
            data_node_type,
            primary,
            secondary,
            primary_cost: RunningCost::default(),
            secondary_cost: RunningCost::default(),
        }
    }

    fn route(&self, object_type: ObjectType) -> (&Arc<dyn Backend>, &RunningCost) {
        if object_type == self.index_node_type {
            (&self.primary, &self.primary_cost)
        } else {
            debug_assert_eq!(
                object_type, self.data_node_type,
                "object type routed through BiStorage must be either the index or data node tag"
            );
            (&self.secondary, &self.secondary_cost)
        }
    }

    pub fn read_bytes(&self, uid: Uid) -> Result<Vec<u8>> {
        let (backend, cost) = self.route(uid.object_type());
        cost.record_read();
        backend.read_bytes(uid)
    }

    pub fn write(&self, object_type: ObjectType, bytes: &[u8]) -> Result<Uid> {
        let (backend, cost) = self.route(object_type);
        cost.record_write();
        backend.write(object_type, bytes)
    }

    pub fn overwrite(&self, uid: Uid, bytes: &[u8]) -> Result<Option<Uid>> {
        let (backend, cost) = self.route(uid.object_type());
        cost.record_write();
        backend.overwrite(uid, bytes)
    }

    pub fn remove(&self, uid: Uid) -> Result<()> {
        let (backend, _) = self.route(uid.object_type());
        backend.remove(uid)
    }

    pub fn flush(&self) -> Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }

    pub fn primary_access_cost(&self) -> AccessCost {
        self.primary.access_cost()
    }

    pub fn secondary_access_cost(&self) -> AccessCost {
        self.secondary.access_cost()
    }

    /// Access cost for whichever backend serves `object_type`, used by the
    /// device-aware selector's reporting (§4.8).
    pub fn access_cost(&self, object_type: ObjectType) -> AccessCost {
        self.route(object_type).0.access_cost()
    }

    pub fn primary_read_count(&self) -> u64 {
        self.primary_cost.reads.load(Ordering::Relaxed)
    }

    pub fn primary_write_count(&self) -> u64 {
        self.primary_cost.writes.load(Ordering::Relaxed)
    }

    pub fn secondary_read_count(&self) -> u64 {
        self.secondary_cost.reads.load(Ordering::Relaxed)
    }

    pub fn secondary_write_count(&self) -> u64 {
        self.secondary_cost.writes.load(Ordering::Relaxed)
    }
}
