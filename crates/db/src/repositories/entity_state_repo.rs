//! Repository for the `entity_states` table.

use retrace_core::owner::OwnerRef;
use sqlx::{PgExecutor, PgPool};

use crate::models::entity_state::EntityStateRow;

/// Column list for entity_states queries.
const COLUMNS: &str = "owner_type, owner_id, state, updated_at";

/// Read and upsert operations for the live attribute state of an owner.
pub struct EntityStateRepo;

impl EntityStateRepo {
    /// The live state row of an owner, if it was ever persisted.
    pub async fn find(
        pool: &PgPool,
        owner: &OwnerRef,
    ) -> Result<Option<EntityStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM entity_states
             WHERE owner_type = $1 AND owner_id = $2"
        );
        sqlx::query_as::<_, EntityStateRow>(&query)
            .bind(&owner.owner_type)
            .bind(owner.owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite the live state of an owner.
    ///
    /// Takes an executor so the store can pair it with a version append in
    /// one transaction.
    pub async fn upsert<'e>(
        executor: impl PgExecutor<'e>,
        owner: &OwnerRef,
        state: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO entity_states (owner_type, owner_id, state)
             VALUES ($1, $2, $3)
             ON CONFLICT (owner_type, owner_id)
             DO UPDATE SET state = EXCLUDED.state, updated_at = now()",
        )
        .bind(&owner.owner_type)
        .bind(owner.owner_id)
        .bind(state)
        .execute(executor)
        .await?;
        Ok(())
    }
}
