//! Ordered version sequences: number assignment, effective-version
//! computation, and revert.
//!
//! A [`VersionSequence`] manages the records of exactly one entity
//! instance. It is created lazily (constructing one performs no I/O), grows
//! by one record per tracked mutation or revert, and never shrinks: a
//! revert appends a fresh record whose diff undoes later changes instead of
//! deleting or renumbering anything.

use crate::change_set::{ChangeSet, Direction};
use crate::error::VersionError;
use crate::owner::OwnerRef;
use crate::record::{ChangeMeta, CreateVersion, VersionRecord};
use crate::store::{StoreError, VersionStore};
use crate::types::{AttributeMap, Timestamp};

// ---------------------------------------------------------------------------
// Revert targets
// ---------------------------------------------------------------------------

/// A revert destination.
///
/// Every variant is resolved to a plain logical version number before any
/// record is written, so `reverted_from` always names the ultimate target
/// and reading the effective version never has to walk a chain.
#[derive(Debug, Clone)]
pub enum RevertTarget {
    /// A raw version number, used as given.
    Number(i64),
    /// A record; resolves to its [`effective_number`]
    /// (`VersionRecord::effective_number`), so reverting "to" a revert
    /// record targets the same logical state it targets.
    Record(VersionRecord),
    /// The latest record carrying this tag.
    Tag(String),
    /// The latest record created at or before this instant. The timestamp
    /// is a lookup key only; ordering stays by number.
    At(Timestamp),
}

impl From<i64> for RevertTarget {
    fn from(number: i64) -> Self {
        Self::Number(number)
    }
}

impl From<VersionRecord> for RevertTarget {
    fn from(record: VersionRecord) -> Self {
        Self::Record(record)
    }
}

impl From<&VersionRecord> for RevertTarget {
    fn from(record: &VersionRecord) -> Self {
        Self::Record(record.clone())
    }
}

impl From<&str> for RevertTarget {
    fn from(tag: &str) -> Self {
        Self::Tag(tag.to_string())
    }
}

impl From<Timestamp> for RevertTarget {
    fn from(at: Timestamp) -> Self {
        Self::At(at)
    }
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Verify the contiguous 1..N numbering invariant of a loaded sequence.
pub(crate) fn validate_contiguous(
    owner: &OwnerRef,
    records: &[VersionRecord],
) -> Result<(), VersionError> {
    for (index, record) in records.iter().enumerate() {
        let expected = index as i64 + 1;
        if record.number != expected {
            return Err(VersionError::Corrupt {
                owner: owner.clone(),
                detail: format!(
                    "expected number {expected} at position {index}, found {}",
                    record.number
                ),
            });
        }
    }
    Ok(())
}

/// Reconstruct the attribute state as of `number` by folding ChangeSets
/// forward from the empty state.
pub(crate) fn state_as_of(records: &[VersionRecord], number: i64) -> AttributeMap {
    records
        .iter()
        .take_while(|record| record.number <= number)
        .fold(AttributeMap::new(), |state, record| {
            record.change_set.apply(&state, Direction::Forward)
        })
}

fn last_number(records: &[VersionRecord]) -> i64 {
    records.last().map_or(0, |record| record.number)
}

// ---------------------------------------------------------------------------
// VersionSequence
// ---------------------------------------------------------------------------

/// The ordered collection of [`VersionRecord`]s belonging to one entity,
/// backed by a [`VersionStore`].
pub struct VersionSequence<'s, S: VersionStore> {
    store: &'s S,
    owner: OwnerRef,
}

impl<'s, S: VersionStore> VersionSequence<'s, S> {
    pub fn new(store: &'s S, owner: OwnerRef) -> Self {
        Self { store, owner }
    }

    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    /// All records, ascending by number.
    ///
    /// The store guarantees the order at the query level; contiguity is
    /// validated on every load so corruption surfaces where it is read,
    /// not three operations later.
    pub async fn records(&self) -> Result<Vec<VersionRecord>, VersionError> {
        let records = self.store.load_records(&self.owner).await?;
        validate_contiguous(&self.owner, &records)?;
        Ok(records)
    }

    /// Number of the physically last record; 0 when no history exists.
    pub async fn current_number(&self) -> Result<i64, VersionError> {
        Ok(last_number(&self.records().await?))
    }

    /// The version the entity logically presents as current.
    ///
    /// A single-hop lookback on the last record only: its `reverted_from`
    /// when it is a revert, otherwise its own number. No chain is ever
    /// walked; revert targets are normalized at write time.
    pub async fn effective_version(&self) -> Result<i64, VersionError> {
        Ok(self
            .records()
            .await?
            .last()
            .map_or(0, VersionRecord::effective_number))
    }

    /// Record the transition from `old_state` to `new_state`.
    ///
    /// Returns `None` without touching the store when the states do not
    /// differ: ordinary no-op saves leave no trace. Otherwise appends a
    /// forward record numbered `last + 1`.
    pub async fn record_change(
        &self,
        old_state: &AttributeMap,
        new_state: &AttributeMap,
        meta: ChangeMeta,
    ) -> Result<Option<VersionRecord>, VersionError> {
        let change_set = ChangeSet::diff(old_state, new_state);
        if change_set.is_empty() {
            return Ok(None);
        }
        let number = last_number(&self.records().await?) + 1;
        let record = self
            .append(
                CreateVersion {
                    owner: self.owner.clone(),
                    number,
                    change_set,
                    reverted_from: None,
                    created_by: meta.created_by,
                    tag: meta.tag,
                },
                None,
            )
            .await?;
        Ok(Some(record))
    }

    /// Revert the entity to a prior recorded state.
    ///
    /// Appends a record whose diff undoes everything after the target and
    /// persists the restored state with it as one unit; returns both. The
    /// record's `reverted_from` names the resolved logical target. An empty
    /// revert diff still appends: a revert is always observable as a
    /// history event, unlike an ordinary no-op save.
    pub async fn revert_to(
        &self,
        target: impl Into<RevertTarget>,
        meta: ChangeMeta,
    ) -> Result<(VersionRecord, AttributeMap), VersionError> {
        let records = self.records().await?;
        let target_number = self.resolve_target(&records, target.into())?;
        self.ensure_exists(&records, target_number)?;

        let current_state = self.store.load_current_state(&self.owner).await?;
        let historical = state_as_of(&records, target_number);
        let change_set = ChangeSet::diff(&current_state, &historical);

        let record = self
            .append(
                CreateVersion {
                    owner: self.owner.clone(),
                    number: last_number(&records) + 1,
                    change_set,
                    reverted_from: Some(target_number),
                    created_by: meta.created_by,
                    tag: meta.tag,
                },
                Some(&historical),
            )
            .await?;
        Ok((record, historical))
    }

    /// Reconstruct the attribute state as of version `number`.
    pub async fn state_at(&self, number: i64) -> Result<AttributeMap, VersionError> {
        let records = self.records().await?;
        self.ensure_exists(&records, number)?;
        Ok(state_as_of(&records, number))
    }

    /// The merged ChangeSet between two recorded versions.
    ///
    /// Composes the intervening diffs in order; with `from > to` the result
    /// is the inverse composition. Entries that net out to no change are
    /// dropped.
    pub async fn changes_between(&self, from: i64, to: i64) -> Result<ChangeSet, VersionError> {
        let records = self.records().await?;
        self.ensure_exists(&records, from)?;
        self.ensure_exists(&records, to)?;

        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let merged = records
            .iter()
            .filter(|record| record.number > low && record.number <= high)
            .fold(ChangeSet::default(), |acc, record| {
                acc.merge(&record.change_set)
            });
        Ok(if from <= to { merged } else { merged.invert() })
    }

    // -- internals --

    fn resolve_target(
        &self,
        records: &[VersionRecord],
        target: RevertTarget,
    ) -> Result<i64, VersionError> {
        match target {
            RevertTarget::Number(number) => Ok(number),
            RevertTarget::Record(record) => Ok(record.effective_number()),
            RevertTarget::Tag(tag) => records
                .iter()
                .rev()
                .find(|record| record.tag.as_deref() == Some(tag.as_str()))
                .map(VersionRecord::effective_number)
                .ok_or_else(|| VersionError::not_found(&self.owner, format!("tagged '{tag}'"))),
            RevertTarget::At(at) => records
                .iter()
                .rev()
                .find(|record| record.created_at <= at)
                .map(VersionRecord::effective_number)
                .ok_or_else(|| VersionError::not_found(&self.owner, format!("at {at}"))),
        }
    }

    fn ensure_exists(&self, records: &[VersionRecord], number: i64) -> Result<(), VersionError> {
        // Numbers are contiguous from 1, so existence is a range check.
        if number < 1 || number > last_number(records) {
            return Err(VersionError::not_found(&self.owner, number.to_string()));
        }
        Ok(())
    }

    /// Append with one bounded retry.
    ///
    /// A conflict means another writer claimed the number first; recompute
    /// `last + 1` and try again. A second conflict is fatal.
    async fn append(
        &self,
        mut draft: CreateVersion,
        state: Option<&AttributeMap>,
    ) -> Result<VersionRecord, VersionError> {
        match self.try_append(&draft, state).await {
            Err(StoreError::Conflict { .. }) => {
                draft.number = last_number(&self.records().await?) + 1;
                match self.try_append(&draft, state).await {
                    Err(StoreError::Conflict { detail }) => Err(VersionError::Sequence {
                        owner: self.owner.clone(),
                        detail,
                    }),
                    other => other.map_err(VersionError::from),
                }
            }
            other => other.map_err(VersionError::from),
        }
    }

    async fn try_append(
        &self,
        draft: &CreateVersion,
        state: Option<&AttributeMap>,
    ) -> Result<VersionRecord, StoreError> {
        match state {
            Some(state) => self.store.append_and_persist(draft, state).await,
            None => self.store.append_record(draft).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
