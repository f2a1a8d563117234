//! The versioned entity façade.
//!
//! [`VersionedEntity`] is the mutable subject: a live attribute state plus
//! the [`VersionSequence`] that tracks it. The live state always equals the
//! cumulative application of the sequence's ChangeSets up to the effective
//! version.

use crate::error::VersionError;
use crate::owner::OwnerRef;
use crate::record::{ChangeMeta, VersionRecord};
use crate::sequence::{RevertTarget, VersionSequence};
use crate::store::VersionStore;
use crate::types::AttributeMap;

pub struct VersionedEntity<'s, S: VersionStore> {
    store: &'s S,
    sequence: VersionSequence<'s, S>,
    state: AttributeMap,
}

impl<'s, S: VersionStore> VersionedEntity<'s, S> {
    /// Create the entity.
    ///
    /// Records version 1, whose ChangeSet is the full initial attribute
    /// set, and persists the live state. Creating with no attributes
    /// records nothing; the sequence then starts with the first real
    /// change.
    pub async fn create(
        store: &'s S,
        owner: OwnerRef,
        attributes: AttributeMap,
        meta: ChangeMeta,
    ) -> Result<Self, VersionError> {
        let mut entity = Self {
            store,
            sequence: VersionSequence::new(store, owner),
            state: AttributeMap::new(),
        };
        entity.update(attributes, meta).await?;
        Ok(entity)
    }

    /// Load an existing entity's live state from the store.
    pub async fn load(store: &'s S, owner: OwnerRef) -> Result<Self, VersionError> {
        let state = store.load_current_state(&owner).await?;
        Ok(Self {
            store,
            sequence: VersionSequence::new(store, owner),
            state,
        })
    }

    pub fn owner(&self) -> &OwnerRef {
        self.sequence.owner()
    }

    /// The live attribute state.
    pub fn attributes(&self) -> &AttributeMap {
        &self.state
    }

    pub fn sequence(&self) -> &VersionSequence<'s, S> {
        &self.sequence
    }

    /// The effective version: the number of the version the entity is
    /// logically "at", which differs from the last record's own number when
    /// that record is a revert.
    pub async fn version(&self) -> Result<i64, VersionError> {
        self.sequence.effective_version().await
    }

    /// All version records, ascending by number.
    pub async fn versions(&self) -> Result<Vec<VersionRecord>, VersionError> {
        self.sequence.records().await
    }

    /// Persist a mutation: diff against the live state, append a record
    /// for it, and store the new state. A save that changes nothing leaves
    /// no trace and returns `None`.
    pub async fn update(
        &mut self,
        attributes: AttributeMap,
        meta: ChangeMeta,
    ) -> Result<Option<VersionRecord>, VersionError> {
        let recorded = self
            .sequence
            .record_change(&self.state, &attributes, meta)
            .await?;
        if recorded.is_some() {
            self.store.persist_state(self.owner(), &attributes).await?;
            self.state = attributes;
        }
        Ok(recorded)
    }

    /// Revert to a prior recorded state and persist it.
    ///
    /// `target` may be a version number, a [`VersionRecord`], a tag, or a
    /// timestamp; see [`RevertTarget`].
    pub async fn revert_to(
        &mut self,
        target: impl Into<RevertTarget>,
        meta: ChangeMeta,
    ) -> Result<VersionRecord, VersionError> {
        let (record, restored) = self.sequence.revert_to(target, meta).await?;
        self.state = restored;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};

    fn owner() -> OwnerRef {
        OwnerRef::new("user", 7)
    }

    fn state(pairs: &[(&str, Value)]) -> AttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn seeded_user(store: &MemoryStore) -> VersionedEntity<'_, MemoryStore> {
        let mut user = VersionedEntity::create(
            store,
            owner(),
            state(&[("name", json!("Stephen Richert"))]),
            ChangeMeta::default(),
        )
        .await
        .unwrap();
        user.update(state(&[("name", json!("Steve Jobs"))]), ChangeMeta::default())
            .await
            .unwrap();
        user.update(
            state(&[("name", json!("Steve Jobs")), ("last_name", json!("Richert"))]),
            ChangeMeta::default(),
        )
        .await
        .unwrap();
        user
    }

    #[tokio::test]
    async fn create_records_the_initial_version() {
        let store = MemoryStore::new();
        let user = VersionedEntity::create(
            &store,
            owner(),
            state(&[("name", json!("Stephen Richert"))]),
            ChangeMeta::default(),
        )
        .await
        .unwrap();

        assert_eq!(user.version().await.unwrap(), 1);
        let versions = user.versions().await.unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions[0].is_initial());
        // Version 1 carries the full initial attribute set.
        assert_eq!(
            versions[0].change_set.get("name").unwrap().new,
            json!("Stephen Richert")
        );
    }

    #[tokio::test]
    async fn each_update_appends_one_version() {
        let store = MemoryStore::new();
        let user = seeded_user(&store).await;

        assert_eq!(user.version().await.unwrap(), 3);
        let versions = user.versions().await.unwrap();
        assert_eq!(versions.last().unwrap().number, 3);
        assert_eq!(
            user.attributes().get("last_name"),
            Some(&json!("Richert"))
        );
    }

    #[tokio::test]
    async fn update_without_changes_is_not_versioned() {
        let store = MemoryStore::new();
        let mut user = seeded_user(&store).await;

        let current = user.attributes().clone();
        assert!(user.update(current, ChangeMeta::default()).await.unwrap().is_none());
        assert_eq!(user.version().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn revert_restores_attributes_and_effective_version() {
        let store = MemoryStore::new();
        let mut user = seeded_user(&store).await;

        let record = user.revert_to(1, ChangeMeta::default()).await.unwrap();

        assert_eq!(record.number, 4);
        assert_eq!(record.reverted_from, Some(1));
        assert_eq!(user.version().await.unwrap(), 1);
        assert_eq!(user.attributes().get("name"), Some(&json!("Stephen Richert")));
        assert!(user.attributes().get("last_name").is_none());
        // The persisted live state matches what the entity reports.
        assert_eq!(
            store.load_current_state(&owner()).await.unwrap(),
            *user.attributes()
        );
    }

    #[tokio::test]
    async fn loaded_entity_sees_the_persisted_state() {
        let store = MemoryStore::new();
        {
            let mut user = seeded_user(&store).await;
            user.revert_to(2, ChangeMeta::default()).await.unwrap();
        }

        let user = VersionedEntity::load(&store, owner()).await.unwrap();
        assert_eq!(user.version().await.unwrap(), 2);
        assert_eq!(user.attributes().get("name"), Some(&json!("Steve Jobs")));
    }

    #[tokio::test]
    async fn revert_to_unknown_version_leaves_the_entity_intact() {
        let store = MemoryStore::new();
        let mut user = seeded_user(&store).await;
        let before = user.attributes().clone();

        assert_matches!(
            user.revert_to(9, ChangeMeta::default()).await,
            Err(VersionError::NotFound { .. })
        );
        assert_eq!(user.attributes(), &before);
        assert_eq!(user.version().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn creating_with_no_attributes_records_nothing() {
        let store = MemoryStore::new();
        let user = VersionedEntity::create(
            &store,
            owner(),
            AttributeMap::new(),
            ChangeMeta::default(),
        )
        .await
        .unwrap();
        assert_eq!(user.version().await.unwrap(), 0);
        assert!(user.versions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn change_meta_is_carried_onto_the_record() {
        let store = MemoryStore::new();
        let mut user = seeded_user(&store).await;

        user.update(
            state(&[
                ("name", json!("Steve Jobs")),
                ("last_name", json!("Richert")),
                ("city", json!("Portland")),
            ]),
            ChangeMeta {
                created_by: Some(99),
                tag: Some("audited".to_string()),
            },
        )
        .await
        .unwrap();

        let versions = user.versions().await.unwrap();
        let last = versions.last().unwrap();
        assert_eq!(last.created_by, Some(99));
        assert_eq!(last.tag.as_deref(), Some("audited"));
    }
}
