//! Live entity state row model.

use retrace_core::store::StoreError;
use retrace_core::types::{AttributeMap, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `entity_states` table: the current attributes of one
/// owner, kept in lockstep with its version history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EntityStateRow {
    pub owner_type: String,
    pub owner_id: DbId,
    pub state: serde_json::Value,
    pub updated_at: Timestamp,
}

impl EntityStateRow {
    /// Parse the JSONB state column into an attribute map.
    pub fn into_attributes(self) -> Result<AttributeMap, StoreError> {
        serde_json::from_value(self.state).map_err(|err| {
            StoreError::backend(format!(
                "invalid state for {}/{}: {err}",
                self.owner_type, self.owner_id
            ))
        })
    }
}
