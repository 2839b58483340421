//! Transaction lifecycle: visibility, isolation, discard, completion

use crate::common::*;
use rawkv::TransactionStatus;
use std::time::Duration;

#[test]
fn staged_changes_are_invisible_until_commit() {
    let (db, store) = setup();
    let mut writer = db.begin_transaction().unwrap();
    store.add(&mut writer, "k", b"v").unwrap();

    // The writer reads its own staged add
    assert_eq!(
        store.try_get(&writer, "k", projection::value_bytes).unwrap(),
        Some(b"v".to_vec())
    );

    let reader = db.begin_transaction().unwrap();
    assert_eq!(store.try_get(&reader, "k", projection::value_bytes).unwrap(), None);

    writer.commit().unwrap();
    assert_eq!(read(&db, &store, "k").unwrap().0, b"v");
}

#[test]
fn staged_update_sequence_is_visible_to_own_reads() {
    let (db, store) = setup();
    put(&db, &store, "k", b"1");

    let mut txn = db.begin_transaction().unwrap();
    store.update(&mut txn, "k", b"2", SequenceNumber::INITIAL).unwrap();
    let seq = store
        .try_get(&txn, "k", projection::sequence_number)
        .unwrap()
        .unwrap();
    assert_eq!(seq, SequenceNumber::new(2));
    store.update(&mut txn, "k", b"3", seq).unwrap();
    txn.commit().unwrap();

    assert_eq!(
        read(&db, &store, "k").unwrap(),
        (b"3".to_vec(), SequenceNumber::new(3))
    );
}

#[test]
fn dropping_a_transaction_discards_everything() {
    let (db, store) = setup();
    put(&db, &store, "a", b"1");
    put(&db, &store, "b", b"1");
    let before = snapshot(&db, &store);

    {
        let mut txn = db.begin_transaction().unwrap();
        store.add(&mut txn, "c", b"1").unwrap();
        store.remove(&mut txn, "a").unwrap();
        store.update(&mut txn, "b", b"2", SequenceNumber::INITIAL).unwrap();
        assert_eq!(txn.pending(), 3);
        let pending = txn.pending_operations();
        assert_eq!((pending.adds, pending.removes, pending.updates), (1, 1, 1));
        assert!(format!("{:?}", txn).contains("removes: 1"));
    }

    assert_eq!(snapshot(&db, &store), before);
    assert_eq!(db.transaction_metrics().aborted, 1);
}

#[test]
fn explicit_abort_discards_everything() {
    let (db, store) = setup();
    put(&db, &store, "a", b"1");
    let before = snapshot(&db, &store);

    let mut txn = db.begin_transaction().unwrap();
    store.remove(&mut txn, "a").unwrap();
    txn.abort();
    assert!(matches!(txn.status(), TransactionStatus::Aborted { .. }));
    drop(txn);

    assert_eq!(snapshot(&db, &store), before);
}

#[test]
fn closure_error_rolls_back() {
    let (db, store) = setup();
    put(&db, &store, "a", b"1");
    let before = snapshot(&db, &store);

    let err = db
        .transaction(|txn| {
            store.add(txn, "b", b"1")?;
            store.add(txn, "a", b"again")
        })
        .unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(snapshot(&db, &store), before);
}

#[test]
fn committed_transaction_rejects_further_use() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, "k", b"v").unwrap();
    let info = txn.commit().unwrap();
    assert_eq!(info.mutations, 1);
    assert!(matches!(
        txn.status(),
        TransactionStatus::Committed { .. }
    ));

    let err = store.add(&mut txn, "other", b"v").unwrap_err();
    assert!(matches!(err, StoreError::TransactionAlreadyCompleted { .. }));
    assert!(matches!(
        store.try_get(&txn, "k", projection::key),
        Err(StoreError::TransactionAlreadyCompleted { .. })
    ));
    assert!(matches!(
        txn.commit(),
        Err(StoreError::TransactionAlreadyCompleted { .. })
    ));
}

#[test]
fn aborted_transaction_rejects_further_use() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    txn.abort();
    assert!(!txn.is_active());

    let err = store.try_add(&mut txn, "k", b"v").unwrap_err();
    assert_eq!(err.error_code(), "TransactionAlreadyCompleted");
}

#[test]
fn failed_staging_keeps_transaction_usable() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    assert!(store.remove(&mut txn, "missing").is_err());
    assert!(txn.is_active());
    assert_eq!(txn.pending(), 0);

    store.add(&mut txn, "k", b"v").unwrap();
    txn.commit().unwrap();
    assert!(read(&db, &store, "k").is_some());
}

#[test]
fn cancelled_commit_leaves_store_unchanged() {
    let (db, store) = setup();
    put(&db, &store, "a", b"1");
    let before = snapshot(&db, &store);

    let token = CancellationToken::new();
    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, "b", b"2").unwrap();
    token.cancel();

    let err = txn
        .commit_with(CommitOptions::new().with_cancellation(token))
        .unwrap_err();
    assert!(matches!(err, StoreError::Cancelled));
    assert!(!txn.is_active());
    assert_eq!(snapshot(&db, &store), before);
}

#[test]
fn uncancelled_token_commits_normally() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, "k", b"v").unwrap();
    txn.commit_with(
        CommitOptions::new()
            .with_cancellation(CancellationToken::new())
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap();
    assert!(read(&db, &store, "k").is_some());
}

#[test]
fn read_only_transaction_does_not_advance_version() {
    let (db, store) = setup();
    put(&db, &store, "k", b"v");
    let version = db.version();

    let mut txn = db.begin_transaction().unwrap();
    store.try_get(&txn, "k", projection::key).unwrap();
    let info = txn.commit().unwrap();
    assert_eq!(info.mutations, 0);
    assert_eq!(db.version(), version);
}

#[test]
fn cancelling_staged_ops_commit_without_version_bump() {
    let (db, store) = setup_with_policy(LineagePolicy::Reset);
    let version = db.version();

    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, "tmp", b"v").unwrap();
    store.remove(&mut txn, "tmp").unwrap();
    let info = txn.commit().unwrap();

    assert_eq!(info.mutations, 0);
    assert_eq!(db.version(), version);
    assert_eq!(db.record_count(), 0);
}

#[test]
fn shutdown_rejects_new_transactions() {
    let (db, _store) = setup();
    db.shutdown().unwrap();
    assert!(!db.is_open());
    assert!(matches!(
        db.begin_transaction(),
        Err(StoreError::InvalidOperation(_))
    ));
}

#[test]
fn metrics_count_outcomes() {
    let (db, store) = setup();
    put(&db, &store, "k", b"v");
    let _ = db.transaction(|txn| store.add(txn, "k", b"again"));
    {
        let _open = db.begin_transaction().unwrap();
        let metrics = db.metrics();
        assert_eq!(metrics.transactions_active, 1);
    }

    let metrics = db.metrics();
    assert_eq!(metrics.transactions_committed, 1);
    assert_eq!(metrics.transactions_aborted, 2);
    assert_eq!(metrics.transactions_active, 0);
    assert_eq!(metrics.records, 1);
}

fn setup_with_policy(policy: LineagePolicy) -> (Arc<Database>, RawStore) {
    let db = Arc::new(Database::builder().lineage_policy(policy).open().unwrap());
    let store = RawStore::new(Arc::clone(&db));
    (db, store)
}
