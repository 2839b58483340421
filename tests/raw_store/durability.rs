//! WAL persistence and recovery

use crate::common::*;
use std::fs::OpenOptions;
use std::io::Write;

const WAL: &str = "wal.log";

#[test]
fn committed_records_survive_reopen() {
    for mode in [DurabilityMode::Strict, DurabilityMode::buffered_default(), DurabilityMode::None] {
        let (dir, db, store) = setup_durable(mode);
        put(&db, &store, "a", b"1");
        put(&db, &store, "b", b"2");
        db.transaction(|txn| store.update(txn, "a", b"1b", SequenceNumber::INITIAL))
            .unwrap();
        db.transaction(|txn| store.remove(txn, "b")).unwrap();
        let before = snapshot(&db, &store);
        drop(store);
        drop(db);

        let db = open_at(dir.path(), mode);
        let store = RawStore::new(Arc::clone(&db));
        assert_eq!(snapshot(&db, &store), before, "{:?}", mode);
    }
}

#[test]
fn uncommitted_work_is_not_persisted() {
    let (dir, db, store) = setup_durable(DurabilityMode::Strict);
    put(&db, &store, "kept", b"1");
    {
        let mut txn = db.begin_transaction().unwrap();
        store.add(&mut txn, "discarded", b"1").unwrap();
    }
    drop(store);
    drop(db);

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let store = RawStore::new(Arc::clone(&db));
    let keys = db
        .transaction(|txn| store.collect(txn, "", projection::key))
        .unwrap();
    assert_eq!(keys, vec!["kept"]);
}

#[test]
fn torn_tail_is_ignored_on_recovery() {
    let (dir, db, store) = setup_durable(DurabilityMode::Strict);
    put(&db, &store, "a", b"1");
    let before = snapshot(&db, &store);
    drop(store);
    drop(db);

    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join(WAL))
        .unwrap();
    file.write_all(&[0x2a, 0x00, 0x00, 0x00, 0xde, 0xad]).unwrap();
    drop(file);

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let store = RawStore::new(Arc::clone(&db));
    assert_eq!(snapshot(&db, &store), before);

    // The log stays appendable after the tail is dropped
    put(&db, &store, "b", b"2");
    drop(store);
    drop(db);

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let store = RawStore::new(Arc::clone(&db));
    assert_eq!(snapshot(&db, &store).len(), 2);
}

#[test]
fn corruption_before_the_tail_fails_open_and_keeps_the_log() {
    let (dir, db, store) = setup_durable(DurabilityMode::Strict);
    put(&db, &store, "a", b"first");
    put(&db, &store, "b", b"second");
    drop(store);
    drop(db);

    let wal = dir.path().join(WAL);
    let mut bytes = std::fs::read(&wal).unwrap();
    let at = bytes.windows(5).position(|w| w == b"first").unwrap();
    bytes[at] ^= 0x01;
    std::fs::write(&wal, &bytes).unwrap();

    let opened = Database::builder()
        .path(dir.path())
        .durability(DurabilityMode::Strict)
        .open();
    let err = match opened {
        Ok(_) => panic!("open succeeded over a corrupted log"),
        Err(e) => e,
    };
    assert_eq!(err.error_code(), "Corruption");
    assert_eq!(std::fs::read(&wal).unwrap(), bytes);
}

#[test]
fn version_and_transaction_ids_continue_after_reopen() {
    let (dir, db, store) = setup_durable(DurabilityMode::Strict);
    put(&db, &store, "a", b"1");
    let mut txn = db.begin_transaction().unwrap();
    store.add(&mut txn, "b", b"1").unwrap();
    let last = txn.commit().unwrap();
    drop(txn);
    let version = db.version();
    assert_eq!(last.commit_version, version);
    drop(store);
    drop(db);

    let db = open_at(dir.path(), DurabilityMode::Strict);
    assert_eq!(db.version(), version);
    assert!(db.begin_transaction().unwrap().id() > last.txn_id);

    let store = RawStore::new(Arc::clone(&db));
    put(&db, &store, "c", b"1");
    assert_eq!(db.version(), version + 1);
}

#[test]
fn timestamps_survive_reopen() {
    let (dir, db, store) = setup_durable(DurabilityMode::Strict);
    put(&db, &store, "k", b"v");
    let meta = db
        .transaction(|txn| store.try_get_metadata(txn, "k"))
        .unwrap()
        .unwrap();
    assert!(meta.last_modified_ms > 0);
    drop(store);
    drop(db);

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let store = RawStore::new(Arc::clone(&db));
    let reopened = db
        .transaction(|txn| store.try_get_metadata(txn, "k"))
        .unwrap()
        .unwrap();
    assert_eq!(reopened, meta);
}

#[test]
fn ephemeral_database_writes_no_files() {
    let db = Database::builder().open().unwrap();
    assert!(db.is_ephemeral());
    assert!(db.data_dir().is_none());
}

#[test]
fn database_opens_from_config_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let data = dir.path().join("data");
    let config_path = dir.path().join("rawkv.toml");
    std::fs::write(
        &config_path,
        format!(
            "path = {:?}\nlineage_policy = \"reset\"\n\n[durability]\nmode = \"strict\"\n",
            data.display().to_string()
        ),
    )
    .unwrap();

    let config = rawkv::DatabaseConfig::from_file(&config_path).unwrap();
    let db = Database::builder().config(config).open().unwrap();
    assert_eq!(db.durability_mode(), DurabilityMode::Strict);
    assert_eq!(db.lineage_policy(), LineagePolicy::Reset);
    assert_eq!(db.data_dir(), Some(data.as_path()));
    assert!(data.join(WAL).exists());
}
