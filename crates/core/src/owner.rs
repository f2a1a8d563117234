//! Polymorphic owner references.
//!
//! One version history table serves many entity types; the
//! `(owner_type, owner_id)` pair is the key under which records are stored
//! and queried. Ownership is a plain value key, never inheritance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Identifies the entity instance a version sequence belongs to.
///
/// Two entities of different type or id never share a sequence space, even
/// when their version numbers coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Entity kind, e.g. `"page"` or `"user"`.
    pub owner_type: String,
    /// Database id of the entity instance.
    pub owner_id: DbId,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: DbId) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_type, self.owner_id)
    }
}
