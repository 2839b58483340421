//! Raw and managed persistence are exclusive per entity

use crate::common::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

#[test]
fn raw_entity_rejects_state_manager() {
    let (db, _) = setup();
    let entity = Entity::new("raw-actor", PersistenceMode::Raw, db).unwrap();
    assert!(matches!(
        entity.state_manager(),
        Err(StoreError::InvalidOperation(_))
    ));
}

#[test]
fn managed_entity_rejects_raw_store() {
    let (db, _) = setup();
    let entity = Entity::new("managed-actor", PersistenceMode::Managed, db).unwrap();
    assert!(matches!(
        entity.raw_store(),
        Err(StoreError::InvalidOperation(_))
    ));
}

#[test]
fn raw_entity_store_shares_the_database() {
    let (db, store) = setup();
    let entity = Entity::new("raw-actor", PersistenceMode::Raw, Arc::clone(&db)).unwrap();
    let entity_store = entity.raw_store().unwrap();

    db.transaction(|txn| entity_store.add(txn, "shared", b"v"))
        .unwrap();
    assert!(read(&db, &store, "shared").is_some());
}

#[test]
fn managed_state_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let profile = Profile {
        name: "ada".to_string(),
        visits: 3,
    };
    {
        let db = open_at(dir.path(), DurabilityMode::Strict);
        let entity = Entity::new("user-1", PersistenceMode::Managed, db).unwrap();
        entity.state_manager().unwrap().set_state("profile", &profile).unwrap();
    }

    let db = open_at(dir.path(), DurabilityMode::Strict);
    let entity = Entity::new("user-1", PersistenceMode::Managed, db).unwrap();
    let state = entity.state_manager().unwrap();
    assert_eq!(state.get_state::<Profile>("profile").unwrap(), Some(profile));
    assert_eq!(state.state_names().unwrap(), vec!["profile".to_string()]);
}
