//! PostgreSQL-backed [`VersionStore`].
//!
//! Number assignment is arbitrated by the `uq_versions_owner_number`
//! unique constraint: the losing writer of a concurrent append observes a
//! unique violation, surfaced as [`StoreError::Conflict`], and the core
//! retries once with a recomputed number.

use async_trait::async_trait;
use sqlx::PgPool;

use retrace_core::owner::OwnerRef;
use retrace_core::record::{CreateVersion, VersionRecord};
use retrace_core::store::{StoreError, VersionStore};
use retrace_core::types::AttributeMap;

use crate::models::version::VersionRow;
use crate::repositories::{EntityStateRepo, VersionRepo};

/// [`VersionStore`] implementation over a PostgreSQL pool.
pub struct PgVersionStore {
    pool: PgPool,
}

impl PgVersionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn encode_change_set(draft: &CreateVersion) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(&draft.change_set)
            .map_err(|err| StoreError::backend(format!("unencodable change set: {err}")))
    }

    fn encode_state(state: &AttributeMap) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(state)
            .map_err(|err| StoreError::backend(format!("unencodable state: {err}")))
    }
}

/// Classify a sqlx error at the store boundary.
///
/// A unique violation (PostgreSQL code 23505) on the versions number
/// constraint is a sequence conflict; everything else is a backend fault.
fn classify_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some("uq_versions_owner_number")
        {
            return StoreError::Conflict {
                detail: db_err.to_string(),
            };
        }
    }
    StoreError::backend(err.to_string())
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn load_records(&self, owner: &OwnerRef) -> Result<Vec<VersionRecord>, StoreError> {
        let rows = VersionRepo::list_by_owner(&self.pool, owner)
            .await
            .map_err(classify_sqlx_error)?;
        rows.into_iter().map(VersionRow::into_record).collect()
    }

    async fn append_record(&self, draft: &CreateVersion) -> Result<VersionRecord, StoreError> {
        let change_set = Self::encode_change_set(draft)?;
        tracing::debug!(owner = %draft.owner, number = draft.number, "appending version record");
        let row = VersionRepo::create(
            &self.pool,
            &draft.owner,
            draft.number,
            &change_set,
            draft.reverted_from,
            draft.created_by,
            draft.tag.as_deref(),
        )
        .await
        .map_err(classify_sqlx_error)?;
        row.into_record()
    }

    async fn load_current_state(&self, owner: &OwnerRef) -> Result<AttributeMap, StoreError> {
        let row = EntityStateRepo::find(&self.pool, owner)
            .await
            .map_err(classify_sqlx_error)?;
        match row {
            Some(row) => row.into_attributes(),
            None => Ok(AttributeMap::new()),
        }
    }

    async fn persist_state(
        &self,
        owner: &OwnerRef,
        state: &AttributeMap,
    ) -> Result<(), StoreError> {
        let state = Self::encode_state(state)?;
        EntityStateRepo::upsert(&self.pool, owner, &state)
            .await
            .map_err(classify_sqlx_error)
    }

    /// Both writes in one transaction: a revert is never half-visible.
    async fn append_and_persist(
        &self,
        draft: &CreateVersion,
        state: &AttributeMap,
    ) -> Result<VersionRecord, StoreError> {
        let change_set = Self::encode_change_set(draft)?;
        let state = Self::encode_state(state)?;

        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        let row = VersionRepo::create(
            &mut *tx,
            &draft.owner,
            draft.number,
            &change_set,
            draft.reverted_from,
            draft.created_by,
            draft.tag.as_deref(),
        )
        .await
        .map_err(classify_sqlx_error)?;
        EntityStateRepo::upsert(&mut *tx, &draft.owner, &state)
            .await
            .map_err(classify_sqlx_error)?;
        tx.commit().await.map_err(classify_sqlx_error)?;

        row.into_record()
    }
}
