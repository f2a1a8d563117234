//! Immutable version records and their equality/ordering semantics.

use std::cmp::Ordering;

use serde::Serialize;

use crate::change_set::ChangeSet;
use crate::error::VersionError;
use crate::owner::OwnerRef;
use crate::types::{DbId, Timestamp};

/// The number of the record that represents entity creation.
pub const INITIAL_NUMBER: i64 = 1;

/// Optional metadata attached to a recorded change.
#[derive(Debug, Clone, Default)]
pub struct ChangeMeta {
    /// The actor responsible for the change.
    pub created_by: Option<DbId>,
    /// A human label for the resulting record, usable later as a revert
    /// target.
    pub tag: Option<String>,
}

impl ChangeMeta {
    pub fn by(created_by: DbId) -> Self {
        Self {
            created_by: Some(created_by),
            ..Self::default()
        }
    }

    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Self::default()
        }
    }
}

/// Draft of a record prior to append.
///
/// The caller assigns `number` (previous maximum plus one); the store
/// assigns `created_at` and rejects a number another writer claimed first.
#[derive(Debug, Clone)]
pub struct CreateVersion {
    pub owner: OwnerRef,
    pub number: i64,
    pub change_set: ChangeSet,
    pub reverted_from: Option<i64>,
    pub created_by: Option<DbId>,
    pub tag: Option<String>,
}

/// An immutable, numbered, timestamped history record.
///
/// Equality and ordering are defined by `(owner, number)` alone; two
/// records of distinct owners are never equal and have no order, even with
/// identical numbers. `created_at` is audit metadata and never participates
/// in ordering.
#[derive(Debug, Clone, Serialize)]
pub struct VersionRecord {
    pub owner: OwnerRef,
    pub number: i64,
    pub change_set: ChangeSet,
    /// For records appended by a revert: the logical version that was
    /// reverted to. Always the ultimate target, never an intermediate
    /// revert record's own number.
    pub reverted_from: Option<i64>,
    pub created_by: Option<DbId>,
    pub tag: Option<String>,
    pub created_at: Timestamp,
}

impl VersionRecord {
    /// `true` iff this is the record representing entity creation.
    /// Independent of `reverted_from`.
    pub fn is_initial(&self) -> bool {
        self.number == INITIAL_NUMBER
    }

    /// `true` iff this record was appended by a revert.
    pub fn is_revert(&self) -> bool {
        self.reverted_from.is_some()
    }

    /// The logical version this record stands for: its revert target when
    /// it is a revert, otherwise its own number.
    pub fn effective_number(&self) -> i64 {
        self.reverted_from.unwrap_or(self.number)
    }

    /// Ordering by number, defined only within one owner.
    ///
    /// Comparing records of unrelated owners is a programming error and
    /// fails with [`VersionError::Incomparable`].
    pub fn compare(&self, other: &VersionRecord) -> Result<Ordering, VersionError> {
        if self.owner != other.owner {
            return Err(VersionError::Incomparable {
                left: self.owner.clone(),
                right: other.owner.clone(),
            });
        }
        Ok(self.number.cmp(&other.number))
    }
}

impl PartialEq for VersionRecord {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.number == other.number
    }
}

impl Eq for VersionRecord {}

impl PartialOrd for VersionRecord {
    /// `None` across owners; there is no meaningful order between
    /// sequences of different entities.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        (self.owner == other.owner).then(|| self.number.cmp(&other.number))
    }
}
