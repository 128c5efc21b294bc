//! Optimistic and pessimistic concurrency control through the committer

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::concurrency::{
    timestamp_value, LockProperties, OptimisticVersionControl, PessimisticLockControl,
    VersionProperties,
};
use crate::config::{ConcurrencyConfig, LockIdentity};
use crate::error::{ConcurrencyError, ModelError};
use crate::metadata::ValidatedClassDefs;
use crate::object::{BoRef, BusinessObject, ObjectManager, PrimaryKeyValue, PropertyValues};
use crate::testing::{fixtures, MemoryStore};
use crate::transaction::TransactionCommitter;

fn owner_key() -> PrimaryKeyValue {
    PrimaryKeyValue::single("OwnerId", json!("o-1"))
}

fn stored_owner(store: &MemoryStore) -> PropertyValues {
    store.row("Owner", &owner_key()).unwrap()
}

fn load_owner(defs: &Arc<ValidatedClassDefs>, store: &MemoryStore) -> BusinessObject {
    let owner_class = defs.find_by_name("Owner").unwrap();
    BusinessObject::from_stored(defs.clone(), owner_class, stored_owner(store))
}

fn versioned(defs: &Arc<ValidatedClassDefs>, store: &Arc<MemoryStore>, user: &str, machine: &str) -> BoRef {
    let control = OptimisticVersionControl::new(
        store.clone(),
        VersionProperties::new("VersionNumber").with_last_updated(
            "DateLastUpdated",
            "UserLastUpdated",
            "MachineLastUpdated",
        ),
    )
    .with_identity(LockIdentity::new(user, machine));
    load_owner(defs, store)
        .with_concurrency_control(Box::new(control))
        .into_ref()
}

fn locking(defs: &Arc<ValidatedClassDefs>, store: &Arc<MemoryStore>, user: &str, machine: &str) -> BoRef {
    let config = ConcurrencyConfig::default()
        .with_lock_duration_minutes(20)
        .with_identity(LockIdentity::new(user, machine));
    let control = PessimisticLockControl::new(store.clone(), LockProperties::default(), config);
    load_owner(defs, store)
        .with_concurrency_control(Box::new(control))
        .into_ref()
}

fn seed_versioned_owner(store: &MemoryStore) {
    store.seed(
        "Owner",
        &[
            ("OwnerId", json!("o-1")),
            ("Name", json!("Ann")),
            ("VersionNumber", json!(3)),
        ],
    );
}

#[tokio::test]
async fn test_stale_version_is_rejected_and_rolled_back() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_versioned_owner(&store);
    let committer = TransactionCommitter::new(store.clone());

    let x = versioned(&defs, &store, "alice", "ws-01");
    let y = versioned(&defs, &store, "bob", "ws-02");

    x.begin_edit().await.unwrap();
    x.set_value("Name", json!("Bea")).unwrap();
    committer.persist(&x).await.unwrap();
    assert_eq!(x.get_value("VersionNumber"), json!(4));
    assert_eq!(stored_owner(&store)["VersionNumber"], json!(4));
    assert_eq!(stored_owner(&store)["UserLastUpdated"], json!("alice"));

    y.set_value("Name", json!("Cid")).unwrap();
    let err = committer.persist(&y).await.unwrap_err();
    match err.as_concurrency() {
        Some(ConcurrencyError::EditedConcurrently {
            expected_version,
            stored_version,
            updated_by,
            updated_on,
            updated_at,
            ..
        }) => {
            assert_eq!(*expected_version, 3);
            assert_eq!(*stored_version, Some(4));
            assert_eq!(updated_by.as_deref(), Some("alice"));
            assert_eq!(updated_on.as_deref(), Some("ws-01"));
            assert!(updated_at.is_some());
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert_eq!(y.get_value("VersionNumber"), json!(3));
    assert_eq!(y.get_value("UserLastUpdated"), Value::Null);
    assert_eq!(stored_owner(&store)["Name"], json!("Bea"));
}

#[tokio::test]
async fn test_unchanged_object_keeps_stored_version() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_versioned_owner(&store);
    let committer = TransactionCommitter::new(store.clone());

    let x = versioned(&defs, &store, "alice", "ws-01");
    let y = versioned(&defs, &store, "bob", "ws-02");

    x.begin_edit().await.unwrap();
    committer.persist(&x).await.unwrap();
    assert_eq!(x.get_value("VersionNumber"), json!(3));
    assert_eq!(stored_owner(&store)["VersionNumber"], json!(3));

    y.set_value("Name", json!("Cid")).unwrap();
    committer.persist(&y).await.unwrap();
    assert_eq!(stored_owner(&store)["VersionNumber"], json!(4));
}

#[tokio::test]
async fn test_begin_edit_detects_newer_stored_version() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_versioned_owner(&store);

    let bo = versioned(&defs, &store, "bob", "ws-02");
    store.update("Owner", &owner_key(), "VersionNumber", json!(5));

    let err = bo.begin_edit().await.unwrap_err();
    assert!(matches!(
        err.as_concurrency(),
        Some(ConcurrencyError::BeginEditConflict {
            in_memory_version: 3,
            stored_version: 5,
            ..
        })
    ));
    assert!(!bo.is_editing());
}

#[tokio::test]
async fn test_deleted_row_is_reported() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_versioned_owner(&store);
    let committer = TransactionCommitter::new(store.clone());

    let bo = versioned(&defs, &store, "bob", "ws-02");
    bo.set_value("Name", json!("Cid")).unwrap();
    store.delete("Owner", &owner_key());

    let err = committer.persist(&bo).await.unwrap_err();
    assert!(matches!(
        err.as_concurrency(),
        Some(ConcurrencyError::DeletedConcurrently { .. })
    ));
    assert_eq!(bo.get_value("VersionNumber"), json!(3));

    let err = bo.begin_edit().await.unwrap_err();
    assert!(matches!(
        err.as_concurrency(),
        Some(ConcurrencyError::DeletedConcurrently { .. })
    ));
}

#[tokio::test]
async fn test_new_object_is_inserted_at_version_one() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    let objects = Arc::new(ObjectManager::new());
    let committer = TransactionCommitter::new(store.clone()).with_object_manager(objects.clone());

    let control = OptimisticVersionControl::new(store.clone(), VersionProperties::default())
        .with_identity(LockIdentity::new("alice", "ws-01"));
    let bo = BusinessObject::new(defs.clone(), defs.find_by_name("Owner").unwrap())
        .with_concurrency_control(Box::new(control))
        .into_ref();
    bo.set_value("Name", json!("Dee")).unwrap();

    committer.persist(&bo).await.unwrap();

    let key = bo.primary_key().unwrap();
    let row = store.row("Owner", &key).unwrap();
    assert_eq!(row["VersionNumber"], json!(1));
    assert_eq!(row["Name"], json!("Dee"));
    assert!(!bo.is_new());
    assert!(!bo.is_dirty());
    assert_eq!(objects.len(), 1);
}

fn seed_locked_owner(store: &MemoryStore, locked_at: chrono::DateTime<Utc>) {
    store.seed(
        "Owner",
        &[
            ("OwnerId", json!("o-1")),
            ("Name", json!("Ann")),
            ("Locked", json!(true)),
            ("DateTimeLocked", timestamp_value(locked_at)),
            ("UserLocked", json!("alice")),
            ("MachineLocked", json!("ws-01")),
        ],
    );
}

#[tokio::test]
async fn test_lock_held_by_another_user_blocks_until_it_expires() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_locked_owner(&store, Utc::now());

    let bo = locking(&defs, &store, "bob", "ws-02");
    let err = bo.begin_edit().await.unwrap_err();
    match err.as_concurrency() {
        Some(ConcurrencyError::LockedByAnotherUser {
            locked_by,
            locked_on,
            ..
        }) => {
            assert_eq!(locked_by, "alice");
            assert_eq!(locked_on, "ws-01");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let expired = Utc::now() - Duration::minutes(21);
    store.update("Owner", &owner_key(), "DateTimeLocked", timestamp_value(expired));

    bo.begin_edit().await.unwrap();
    assert!(bo.is_editing());
    let row = stored_owner(&store);
    assert_eq!(row["Locked"], json!(true));
    assert_eq!(row["UserLocked"], json!("bob"));
    assert_eq!(row["MachineLocked"], json!("ws-02"));
    assert_eq!(row["OperatingSystemUserLocked"], json!("bob"));
}

#[tokio::test]
async fn test_persist_releases_lock() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_locked_owner(&store, Utc::now() - Duration::minutes(30));
    let committer = TransactionCommitter::new(store.clone());

    let bob = locking(&defs, &store, "bob", "ws-02");
    bob.begin_edit().await.unwrap();
    bob.set_value("Name", json!("Bea")).unwrap();
    committer.persist(&bob).await.unwrap();

    let row = stored_owner(&store);
    assert_eq!(row["Name"], json!("Bea"));
    assert_eq!(row["Locked"], json!(false));

    let alice = locking(&defs, &store, "alice", "ws-01");
    alice.begin_edit().await.unwrap();
}

#[tokio::test]
async fn test_expired_own_lock_fails_persist() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_locked_owner(&store, Utc::now() - Duration::minutes(30));
    let committer = TransactionCommitter::new(store.clone());

    let bob = locking(&defs, &store, "bob", "ws-02");
    bob.begin_edit().await.unwrap();
    bob.set_value("Name", json!("Bea")).unwrap();
    let stale = timestamp_value(Utc::now() - Duration::minutes(21));
    bob.set_value_internal("DateTimeLocked", stale, true);

    let err = committer.persist(&bob).await.unwrap_err();
    assert!(matches!(
        err,
        ModelError::Concurrency(ConcurrencyError::LockDurationExceeded {
            duration_minutes: 20,
            ..
        })
    ));
    assert_eq!(bob.get_value("Locked"), json!(true));
    assert_eq!(stored_owner(&store)["Name"], json!("Ann"));
}

#[tokio::test]
async fn test_cancel_edit_releases_lock() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_locked_owner(&store, Utc::now() - Duration::minutes(30));

    let bob = locking(&defs, &store, "bob", "ws-02");
    bob.begin_edit().await.unwrap();
    assert_eq!(stored_owner(&store)["Locked"], json!(true));

    bob.cancel_edit().await.unwrap();
    assert_eq!(stored_owner(&store)["Locked"], json!(false));

    // releasing again is a no-op
    bob.release_locks().await.unwrap();
}

#[tokio::test]
async fn test_release_leaves_lock_claimed_by_another_user() {
    let defs = fixtures::owner_car_defs();
    let store = MemoryStore::new();
    seed_locked_owner(&store, Utc::now() - Duration::minutes(30));

    let bob = locking(&defs, &store, "bob", "ws-02");
    bob.begin_edit().await.unwrap();

    let expired = Utc::now() - Duration::minutes(21);
    store.update("Owner", &owner_key(), "DateTimeLocked", timestamp_value(expired));
    let alice = locking(&defs, &store, "alice", "ws-01");
    alice.begin_edit().await.unwrap();

    bob.cancel_edit().await.unwrap();
    let row = stored_owner(&store);
    assert_eq!(row["Locked"], json!(true));
    assert_eq!(row["UserLocked"], json!("alice"));
    assert_eq!(row["MachineLocked"], json!("ws-01"));

    alice.release_locks().await.unwrap();
    assert_eq!(stored_owner(&store)["Locked"], json!(false));
}
