//! Sequence lineage across remove-then-recreate

use crate::common::*;

fn open_with(policy: LineagePolicy) -> (Arc<Database>, RawStore) {
    init_tracing();
    let db = Arc::new(Database::builder().lineage_policy(policy).open().unwrap());
    let store = RawStore::new(Arc::clone(&db));
    (db, store)
}

/// add, update twice, remove, add again; returns the sequence after re-add
fn recreate(db: &Database, store: &RawStore) -> SequenceNumber {
    put(db, store, "k", b"v1");
    db.transaction(|txn| store.update(txn, "k", b"v2", SequenceNumber::new(1)))
        .unwrap();
    db.transaction(|txn| store.update(txn, "k", b"v3", SequenceNumber::new(2)))
        .unwrap();
    db.transaction(|txn| store.remove(txn, "k")).unwrap();
    put(db, store, "k", b"again");
    read(db, store, "k").unwrap().1
}

#[test]
fn default_policy_is_continue() {
    let db = Database::ephemeral();
    assert_eq!(db.lineage_policy(), LineagePolicy::Continue);
}

#[test]
fn continue_policy_resumes_after_retired_sequence() {
    let (db, store) = open_with(LineagePolicy::Continue);
    assert_eq!(recreate(&db, &store), SequenceNumber::new(4));
}

#[test]
fn continue_policy_rejects_token_from_previous_incarnation() {
    let (db, store) = open_with(LineagePolicy::Continue);
    put(&db, &store, "k", b"v");
    db.transaction(|txn| store.remove(txn, "k")).unwrap();
    put(&db, &store, "k", b"new");

    // A holder of the first incarnation's token must not overwrite the new record
    let mut txn = db.begin_transaction().unwrap();
    let err = store
        .update(&mut txn, "k", b"stale", SequenceNumber::INITIAL)
        .unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn continue_policy_keeps_lineage_of_key_created_and_removed_in_one_transaction() {
    let (db, store) = open_with(LineagePolicy::Continue);
    db.transaction(|txn| {
        store.add(txn, "k", b"v")?;
        store.remove(txn, "k")
    })
    .unwrap();
    put(&db, &store, "k", b"later");
    assert_eq!(read(&db, &store, "k").unwrap().1, SequenceNumber::new(2));
}

#[test]
fn reset_policy_restarts_at_initial() {
    let (db, store) = open_with(LineagePolicy::Reset);
    assert_eq!(recreate(&db, &store), SequenceNumber::INITIAL);
}

#[test]
fn reset_policy_accepts_initial_token_after_recreate() {
    let (db, store) = open_with(LineagePolicy::Reset);
    put(&db, &store, "k", b"v");
    db.transaction(|txn| store.remove(txn, "k")).unwrap();
    put(&db, &store, "k", b"new");

    db.transaction(|txn| store.update(txn, "k", b"next", SequenceNumber::INITIAL))
        .unwrap();
    assert_eq!(read(&db, &store, "k").unwrap().1, SequenceNumber::new(2));
}

#[test]
fn remove_and_recreate_in_one_transaction() {
    for (policy, expected) in [
        (LineagePolicy::Continue, SequenceNumber::new(2)),
        (LineagePolicy::Reset, SequenceNumber::INITIAL),
    ] {
        let (db, store) = open_with(policy);
        put(&db, &store, "k", b"v");
        db.transaction(|txn| {
            store.remove(txn, "k")?;
            store.add(txn, "k", b"fresh")
        })
        .unwrap();
        assert_eq!(
            read(&db, &store, "k").unwrap(),
            (b"fresh".to_vec(), expected),
            "{:?}",
            policy
        );
    }
}

#[test]
fn continue_lineage_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let db = open_at(dir.path(), DurabilityMode::Strict);
        let store = RawStore::new(Arc::clone(&db));
        put(&db, &store, "k", b"v1");
        db.transaction(|txn| store.update(txn, "k", b"v2", SequenceNumber::INITIAL))
            .unwrap();
        db.transaction(|txn| store.remove(txn, "k")).unwrap();
    }

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let store = RawStore::new(Arc::clone(&db));
    put(&db, &store, "k", b"v3");
    assert_eq!(read(&db, &store, "k").unwrap().1, SequenceNumber::new(3));
}
