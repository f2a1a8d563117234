//! The persistence boundary consumed by the versioning core.
//!
//! The core never talks to a database directly; it calls a [`VersionStore`]
//! collaborator. `retrace-db` provides the PostgreSQL implementation,
//! [`MemoryStore`](crate::memory::MemoryStore) the in-process one.

use async_trait::async_trait;

use crate::owner::OwnerRef;
use crate::record::{CreateVersion, VersionRecord};
use crate::types::AttributeMap;

/// Failures at the storage boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer claimed the sequence number first. Raised by the
    /// store's uniqueness guarantee on `(owner_type, owner_id, number)`;
    /// the sequence recomputes the number and retries once.
    #[error("sequence number conflict: {detail}")]
    Conflict { detail: String },

    /// Any other backend failure, surfaced unchanged. The core performs no
    /// speculative recovery of storage faults.
    #[error("store backend error: {detail}")]
    Backend { detail: String },
}

impl StoreError {
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend {
            detail: detail.into(),
        }
    }
}

/// Narrow persistence interface for version histories and live states.
///
/// `load_records` must return records ascending by `number` through an
/// explicit sort key, not insertion order: callers rely on natural
/// iteration order for display and first/last access and never re-sort.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// All records of `owner`, ascending by number.
    async fn load_records(&self, owner: &OwnerRef) -> Result<Vec<VersionRecord>, StoreError>;

    /// Append a record with a caller-assigned number.
    ///
    /// Fails with [`StoreError::Conflict`] when that number is already
    /// taken, which is how concurrent writers lose the race.
    async fn append_record(&self, draft: &CreateVersion) -> Result<VersionRecord, StoreError>;

    /// The live attribute state of `owner`; empty if never persisted.
    async fn load_current_state(&self, owner: &OwnerRef) -> Result<AttributeMap, StoreError>;

    /// Overwrite the live attribute state of `owner`.
    async fn persist_state(&self, owner: &OwnerRef, state: &AttributeMap)
        -> Result<(), StoreError>;

    /// Append a record and persist the matching live state as one unit.
    ///
    /// Reverts go through this so a partially applied revert is never
    /// observable. The default implementation issues the two writes
    /// sequentially; transactional stores override it.
    async fn append_and_persist(
        &self,
        draft: &CreateVersion,
        state: &AttributeMap,
    ) -> Result<VersionRecord, StoreError> {
        let record = self.append_record(draft).await?;
        self.persist_state(&draft.owner, state).await?;
        Ok(record)
    }
}
