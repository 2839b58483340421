//! Point operations: add, remove, update and their try-variants

use crate::common::*;

// ============================================================================
// add / try_add
// ============================================================================

#[test]
fn add_then_get_returns_value_and_initial_sequence() {
    let (db, store) = setup();
    let key = unique_key("add");
    put(&db, &store, &key, b"Value");

    assert_eq!(
        read(&db, &store, &key),
        Some((b"Value".to_vec(), SequenceNumber::INITIAL))
    );
}

#[test]
fn add_existing_key_is_duplicate() {
    let (db, store) = setup();
    put(&db, &store, "k", b"first");

    let mut txn = db.begin_transaction().unwrap();
    let err = store.add(&mut txn, "k", b"second").unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
    assert!(err.is_duplicate());
}

#[test]
fn try_add_existing_key_returns_false_and_keeps_record() {
    let (db, store) = setup();
    put(&db, &store, "k", b"first");
    let before = snapshot(&db, &store);

    let added = db
        .transaction(|txn| store.try_add(txn, "k", b"second"))
        .unwrap();
    assert!(!added);
    assert_eq!(snapshot(&db, &store), before);
}

#[test]
fn try_add_new_key_returns_true() {
    let (db, store) = setup();
    assert!(db.transaction(|txn| store.try_add(txn, "k", b"v")).unwrap());
    assert_eq!(read(&db, &store, "k").unwrap().0, b"v");
}

#[test]
fn add_copies_caller_buffers() {
    let (db, store) = setup();
    let mut key = String::from("owned");
    let mut value = vec![1u8, 2, 3];

    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, &key, &value).unwrap();
    key.push_str("-changed");
    value.clear();
    txn.commit().unwrap();

    assert_eq!(read(&db, &store, "owned").unwrap().0, vec![1, 2, 3]);
}

#[test]
fn empty_value_is_stored() {
    let (db, store) = setup();
    put(&db, &store, "empty", b"");
    assert_eq!(read(&db, &store, "empty").unwrap().0, Vec::<u8>::new());
}

// ============================================================================
// remove / try_remove
// ============================================================================

#[test]
fn remove_missing_key_is_not_found() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    let err = store.remove(&mut txn, "missing").unwrap_err();
    assert!(matches!(err, StoreError::KeyNotFound { .. }));
}

#[test]
fn try_remove_missing_key_returns_false() {
    let (db, store) = setup();
    let removed = db
        .transaction(|txn| store.try_remove(txn, "missing"))
        .unwrap();
    assert!(!removed);
}

#[test]
fn remove_destroys_record() {
    let (db, store) = setup();
    put(&db, &store, "k", b"v");
    db.transaction(|txn| store.remove(txn, "k")).unwrap();

    assert_eq!(read(&db, &store, "k"), None);
    assert_eq!(db.record_count(), 0);
}

#[test]
fn try_get_missing_key_is_none() {
    let (db, store) = setup();
    let txn = db.begin_transaction().unwrap();
    assert_eq!(
        store.try_get(&txn, "nothing", projection::value_bytes).unwrap(),
        None
    );
}

// ============================================================================
// update / try_update
// ============================================================================

#[test]
fn update_with_current_sequence_replaces_value() {
    let (db, store) = setup();
    put(&db, &store, "k", b"old");
    let (_, seq) = read(&db, &store, "k").unwrap();

    db.transaction(|txn| store.update(txn, "k", b"new", seq))
        .unwrap();

    let (value, next) = read(&db, &store, "k").unwrap();
    assert_eq!(value, b"new");
    assert!(next > seq);
}

#[test]
fn update_missing_key_is_not_found() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    let err = store
        .update(&mut txn, "missing", b"v", SequenceNumber::INITIAL)
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn try_update_with_stale_sequence_is_conflict_and_leaves_record() {
    let (db, store) = setup();
    put(&db, &store, "k", b"v1");
    let (_, seq1) = read(&db, &store, "k").unwrap();
    db.transaction(|txn| store.update(txn, "k", b"v2", seq1))
        .unwrap();
    let before = read(&db, &store, "k").unwrap();

    let mut txn = db.begin_transaction().unwrap();
    let err = store.try_update(&mut txn, "k", b"v3", seq1).unwrap_err();
    match err {
        StoreError::VersionConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, seq1);
            assert_eq!(actual, before.1);
        }
        other => panic!("expected VersionConflict, got {:?}", other),
    }
    txn.commit().unwrap();

    assert_eq!(read(&db, &store, "k").unwrap(), before);
}

#[test]
fn try_update_missing_key_is_not_found() {
    let (db, store) = setup();
    let mut txn = db.begin_transaction().unwrap();
    let err = store
        .try_update(&mut txn, "missing", b"v", SequenceNumber::INITIAL)
        .unwrap_err();
    assert!(matches!(err, StoreError::KeyNotFound { .. }));
    assert!(txn.is_active());
}

#[test]
fn try_update_with_current_sequence_returns_true() {
    let (db, store) = setup();
    put(&db, &store, "k", b"v1");
    let updated = db
        .transaction(|txn| store.try_update(txn, "k", b"v2", SequenceNumber::INITIAL))
        .unwrap();
    assert!(updated);
    assert_eq!(
        read(&db, &store, "k").unwrap(),
        (b"v2".to_vec(), SequenceNumber::new(2))
    );
}

#[test]
fn sequence_numbers_are_per_key() {
    let (db, store) = setup();
    put(&db, &store, "a", b"1");
    put(&db, &store, "b", b"1");
    let (_, a1) = read(&db, &store, "a").unwrap();
    db.transaction(|txn| store.update(txn, "a", b"2", a1)).unwrap();

    assert_eq!(read(&db, &store, "a").unwrap().1, SequenceNumber::new(2));
    assert_eq!(read(&db, &store, "b").unwrap().1, SequenceNumber::INITIAL);
}

// ============================================================================
// Codec round-trip and mode equivalence
// ============================================================================

#[test]
fn non_ascii_key_and_binary_value_round_trip() {
    let (db, store) = setup();
    let key = "clé/ключ/鍵";
    let value: Vec<u8> = (0..=255u8).collect();
    put(&db, &store, key, &value);

    let txn = db.begin_transaction().unwrap();
    let (k, v) = store.try_get(&txn, key, projection::key_value).unwrap().unwrap();
    assert_eq!(k, key);
    assert_eq!(v, value);
}

#[test]
fn operations_behave_the_same_in_every_mode() {
    test_across_modes("basic_ops", |db, store| {
        put(db, store, "k", b"v");
        let (_, seq) = read(db, store, "k").unwrap();
        db.transaction(|txn| store.update(txn, "k", b"w", seq)).unwrap();
        let dup = db.transaction(|txn| store.try_add(txn, "k", b"x")).unwrap();
        let gone = db.transaction(|txn| store.try_remove(txn, "other")).unwrap();
        (snapshot(db, store), dup, gone)
    });
}
