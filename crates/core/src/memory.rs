//! In-memory [`VersionStore`] for tests and embedded use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::owner::OwnerRef;
use crate::record::{CreateVersion, VersionRecord};
use crate::store::{StoreError, VersionStore};
use crate::types::AttributeMap;

#[derive(Default)]
struct OwnerSlot {
    records: Vec<VersionRecord>,
    state: AttributeMap,
}

/// Process-local store keeping every sequence in a mutex-guarded map.
///
/// Records are held sorted by `number`, the same guarantee a SQL
/// implementation provides through `ORDER BY number`. The single mutex
/// serializes writers, so number assignment cannot race within one
/// process.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<OwnerRef, OwnerSlot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<OwnerRef, OwnerSlot>>, StoreError> {
        self.slots
            .lock()
            .map_err(|_| StoreError::backend("store mutex poisoned"))
    }

    fn append_locked(
        slot: &mut OwnerSlot,
        draft: &CreateVersion,
    ) -> Result<VersionRecord, StoreError> {
        let expected = slot.records.last().map_or(0, |r| r.number) + 1;
        if draft.number != expected {
            return Err(StoreError::Conflict {
                detail: format!("expected number {expected}, got {}", draft.number),
            });
        }
        let record = VersionRecord {
            owner: draft.owner.clone(),
            number: draft.number,
            change_set: draft.change_set.clone(),
            reverted_from: draft.reverted_from,
            created_by: draft.created_by,
            tag: draft.tag.clone(),
            created_at: Utc::now(),
        };
        slot.records.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl VersionStore for MemoryStore {
    async fn load_records(&self, owner: &OwnerRef) -> Result<Vec<VersionRecord>, StoreError> {
        let slots = self.lock()?;
        Ok(slots
            .get(owner)
            .map(|slot| slot.records.clone())
            .unwrap_or_default())
    }

    async fn append_record(&self, draft: &CreateVersion) -> Result<VersionRecord, StoreError> {
        let mut slots = self.lock()?;
        let slot = slots.entry(draft.owner.clone()).or_default();
        Self::append_locked(slot, draft)
    }

    async fn load_current_state(&self, owner: &OwnerRef) -> Result<AttributeMap, StoreError> {
        let slots = self.lock()?;
        Ok(slots
            .get(owner)
            .map(|slot| slot.state.clone())
            .unwrap_or_default())
    }

    async fn persist_state(
        &self,
        owner: &OwnerRef,
        state: &AttributeMap,
    ) -> Result<(), StoreError> {
        let mut slots = self.lock()?;
        slots.entry(owner.clone()).or_default().state = state.clone();
        Ok(())
    }

    async fn append_and_persist(
        &self,
        draft: &CreateVersion,
        state: &AttributeMap,
    ) -> Result<VersionRecord, StoreError> {
        // Both writes under one lock acquisition: all-or-nothing, since the
        // append is the only step that can fail.
        let mut slots = self.lock()?;
        let slot = slots.entry(draft.owner.clone()).or_default();
        let record = Self::append_locked(slot, draft)?;
        slot.state = state.clone();
        Ok(record)
    }
}
