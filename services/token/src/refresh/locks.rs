//! Per-lineage serialization of renewals.
//!
//! Renewals of different lineages proceed in parallel; renewals of the same
//! lineage run one at a time within this process. The store's atomic child
//! creation covers the rest.

use crate::refresh::lineage::AccessTokenRef;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Dead slots are swept once the table reaches this size.
const PRUNE_FLOOR: usize = 64;

struct Slots {
    table: HashMap<AccessTokenRef, Weak<AsyncMutex<()>>>,
    prune_at: usize,
}

impl Default for Slots {
    fn default() -> Self {
        Slots {
            table: HashMap::new(),
            prune_at: PRUNE_FLOOR,
        }
    }
}

/// Async mutex per lineage, created on first use and dropped with its last guard.
#[derive(Default)]
pub struct LineageLocks {
    slots: Mutex<Slots>,
}

impl LineageLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a lineage. Released when the guard drops.
    pub async fn acquire(&self, lineage: &AccessTokenRef) -> OwnedMutexGuard<()> {
        self.slot(lineage).lock_owned().await
    }

    fn slot(&self, lineage: &AccessTokenRef) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock();

        if let Some(existing) = slots.table.get(lineage).and_then(Weak::upgrade) {
            return existing;
        }

        // Amortized: the threshold doubles with the live set.
        if slots.table.len() >= slots.prune_at {
            slots.table.retain(|_, slot| slot.strong_count() > 0);
            slots.prune_at = (slots.table.len() * 2).max(PRUNE_FLOOR);
        }

        let slot = Arc::new(AsyncMutex::new(()));
        slots.table.insert(lineage.clone(), Arc::downgrade(&slot));
        slot
    }

    /// Lineages with a live lock.
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .table
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}
