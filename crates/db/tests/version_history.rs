//! Integration tests for the PostgreSQL version store.
//!
//! Exercises the full stack against a real database: append/list ordering,
//! unique-constraint arbitration, transactional revert commits, and the
//! end-to-end revert scenarios through the core engine.

use assert_matches::assert_matches;
use serde_json::{json, Value};
use sqlx::PgPool;

use retrace_core::record::{ChangeMeta, CreateVersion};
use retrace_core::store::{StoreError, VersionStore};
use retrace_core::types::AttributeMap;
use retrace_core::{ChangeSet, OwnerRef, VersionedEntity};
use retrace_db::repositories::VersionRepo;
use retrace_db::PgVersionStore;

fn state(pairs: &[(&str, Value)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn draft(owner: &OwnerRef, number: i64) -> CreateVersion {
    CreateVersion {
        owner: owner.clone(),
        number,
        change_set: ChangeSet::diff(
            &AttributeMap::new(),
            &state(&[("step", json!(number))]),
        ),
        reverted_from: None,
        created_by: None,
        tag: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn health_check_passes(pool: PgPool) {
    retrace_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "./migrations")]
async fn records_come_back_ascending_by_number(pool: PgPool) {
    let store = PgVersionStore::new(pool);
    let owner = OwnerRef::new("page", 1);

    for number in 1..=4 {
        store.append_record(&draft(&owner, number)).await.unwrap();
    }

    let numbers: Vec<i64> = store
        .load_records(&owner)
        .await
        .unwrap()
        .iter()
        .map(|r| r.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    let row = VersionRepo::find_by_owner_and_number(store.pool(), &owner, 3)
        .await
        .unwrap()
        .expect("version 3 exists");
    assert_eq!(row.number, 3);
    assert!(
        VersionRepo::find_by_owner_and_number(store.pool(), &owner, 9)
            .await
            .unwrap()
            .is_none()
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_number_is_a_conflict(pool: PgPool) {
    let store = PgVersionStore::new(pool);
    let owner = OwnerRef::new("page", 1);

    store.append_record(&draft(&owner, 1)).await.unwrap();
    assert_matches!(
        store.append_record(&draft(&owner, 1)).await,
        Err(StoreError::Conflict { .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn owners_do_not_share_number_space(pool: PgPool) {
    let store = PgVersionStore::new(pool);
    let a = OwnerRef::new("page", 1);
    let b = OwnerRef::new("user", 1);

    store.append_record(&draft(&a, 1)).await.unwrap();
    // Same number, different owner type: no conflict.
    store.append_record(&draft(&b, 1)).await.unwrap();

    assert_eq!(store.load_records(&a).await.unwrap().len(), 1);
    assert_eq!(store.load_records(&b).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn append_and_persist_commits_both_writes(pool: PgPool) {
    let store = PgVersionStore::new(pool.clone());
    let owner = OwnerRef::new("page", 7);
    let target = state(&[("title", json!("restored"))]);

    let record = store
        .append_and_persist(&draft(&owner, 1), &target)
        .await
        .unwrap();

    assert_eq!(record.number, 1);
    assert_eq!(store.load_current_state(&owner).await.unwrap(), target);
    assert_eq!(
        VersionRepo::max_number(&pool, &owner).await.unwrap(),
        1
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn append_and_persist_rolls_back_on_conflict(pool: PgPool) {
    let store = PgVersionStore::new(pool);
    let owner = OwnerRef::new("page", 7);
    let before = state(&[("title", json!("original"))]);
    store.persist_state(&owner, &before).await.unwrap();
    store.append_record(&draft(&owner, 1)).await.unwrap();

    let result = store
        .append_and_persist(&draft(&owner, 1), &state(&[("title", json!("lost"))]))
        .await;

    assert_matches!(result, Err(StoreError::Conflict { .. }));
    // Neither write is visible: the state kept its previous value.
    assert_eq!(store.load_current_state(&owner).await.unwrap(), before);
}

#[sqlx::test(migrations = "./migrations")]
async fn revert_scenarios_run_end_to_end(pool: PgPool) {
    let store = PgVersionStore::new(pool);
    let owner = OwnerRef::new("user", 1);

    let mut user = VersionedEntity::create(
        &store,
        owner.clone(),
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
    assert_eq!(user.version().await.unwrap(), 3);

    // Revert to 1: record 4 appended, effective version 1.
    let record = user.revert_to(1, ChangeMeta::default()).await.unwrap();
    assert_eq!(record.number, 4);
    assert_eq!(record.reverted_from, Some(1));
    assert_eq!(user.version().await.unwrap(), 1);
    assert_eq!(user.attributes().get("name"), Some(&json!("Stephen Richert")));

    // Revert to 2 from there.
    let record = user.revert_to(2, ChangeMeta::default()).await.unwrap();
    assert_eq!(record.number, 5);
    assert_eq!(record.reverted_from, Some(2));
    assert_eq!(user.version().await.unwrap(), 2);

    // Double revert: remember the effective-version-2 record, mutate,
    // revert "to" that record; it must resolve to logical target 2.
    let versions = user.versions().await.unwrap();
    let remembered = versions.last().unwrap().clone();
    user.update(
        state(&[("name", json!("Steve Jobs")), ("last_name", json!("Gates"))]),
        ChangeMeta::default(),
    )
    .await
    .unwrap();
    let record = user
        .revert_to(&remembered, ChangeMeta::default())
        .await
        .unwrap();
    assert_eq!(record.number, 7);
    assert_eq!(record.reverted_from, Some(2));
    assert_eq!(user.version().await.unwrap(), 2);

    // History is intact and contiguous.
    let numbers: Vec<i64> = user
        .versions()
        .await
        .unwrap()
        .iter()
        .map(|r| r.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
}
