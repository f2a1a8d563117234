//! Version record row model.
//!
//! Versions are immutable, append-only rows; one per recorded change or
//! revert of an owning entity.

use retrace_core::change_set::ChangeSet;
use retrace_core::owner::OwnerRef;
use retrace_core::record::VersionRecord;
use retrace_core::store::StoreError;
use retrace_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `versions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VersionRow {
    pub id: DbId,
    pub owner_type: String,
    pub owner_id: DbId,
    pub number: i64,
    pub change_set: serde_json::Value,
    pub reverted_from: Option<i64>,
    pub created_by: Option<DbId>,
    pub tag: Option<String>,
    pub created_at: Timestamp,
}

impl VersionRow {
    /// Convert into the domain record, parsing the JSONB diff.
    pub fn into_record(self) -> Result<VersionRecord, StoreError> {
        let change_set: ChangeSet = serde_json::from_value(self.change_set).map_err(|err| {
            StoreError::backend(format!(
                "invalid change_set in versions row {}: {err}",
                self.id
            ))
        })?;
        Ok(VersionRecord {
            owner: OwnerRef::new(self.owner_type, self.owner_id),
            number: self.number,
            change_set,
            reverted_from: self.reverted_from,
            created_by: self.created_by,
            tag: self.tag,
            created_at: self.created_at,
        })
    }
}
