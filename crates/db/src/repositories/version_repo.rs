//! Repository for the `versions` table.
//!
//! Version rows are append-only. Every listing orders by `number`
//! ascending at the query level; callers rely on natural iteration order
//! and never re-sort.

use retrace_core::owner::OwnerRef;
use retrace_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::version::VersionRow;

/// Column list for versions queries.
const COLUMNS: &str =
    "id, owner_type, owner_id, number, change_set, reverted_from, created_by, tag, created_at";

/// Read and append operations for version records.
pub struct VersionRepo;

impl VersionRepo {
    /// Append one version row with a caller-assigned number.
    ///
    /// A number another writer claimed first violates
    /// `uq_versions_owner_number`. Takes an executor so the store can run
    /// it inside a transaction.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        owner: &OwnerRef,
        number: i64,
        change_set: &serde_json::Value,
        reverted_from: Option<i64>,
        created_by: Option<DbId>,
        tag: Option<&str>,
    ) -> Result<VersionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO versions
                 (owner_type, owner_id, number, change_set, reverted_from, created_by, tag)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&owner.owner_type)
            .bind(owner.owner_id)
            .bind(number)
            .bind(change_set)
            .bind(reverted_from)
            .bind(created_by)
            .bind(tag)
            .fetch_one(executor)
            .await
    }

    /// List all versions of an owner, ascending by number.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner: &OwnerRef,
    ) -> Result<Vec<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions
             WHERE owner_type = $1 AND owner_id = $2
             ORDER BY number ASC"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&owner.owner_type)
            .bind(owner.owner_id)
            .fetch_all(pool)
            .await
    }

    /// Find a specific version of an owner.
    pub async fn find_by_owner_and_number(
        pool: &PgPool,
        owner: &OwnerRef,
        number: i64,
    ) -> Result<Option<VersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM versions
             WHERE owner_type = $1 AND owner_id = $2 AND number = $3"
        );
        sqlx::query_as::<_, VersionRow>(&query)
            .bind(&owner.owner_type)
            .bind(owner.owner_id)
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    /// The highest assigned number for an owner (0 if no versions exist).
    pub async fn max_number(pool: &PgPool, owner: &OwnerRef) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(number), 0) FROM versions
             WHERE owner_type = $1 AND owner_id = $2",
        )
        .bind(&owner.owner_type)
        .bind(owner.owner_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}
