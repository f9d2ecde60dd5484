//! Integration tests for two-location synchronization.

use appxf_codec::Value;
use appxf_storage::{Storage, StorageOptions, META_TAG, SYNC_TAG};
use appxf_sync::{
    plan, sync_factories, sync_storage, SyncAction, SyncConfig, SyncData, SyncError,
};
use appxf_testkit::prelude::*;
use proptest::prelude::*;

fn uuid(storage: &Storage) -> [u8; 16] {
    storage.require_meta_data().unwrap().uuid
}

/// Raw bytes of the item and its siblings, for "nothing was written" checks.
fn snapshot(storage: &Storage) -> [Vec<u8>; 3] {
    [
        storage.load_raw().unwrap(),
        storage.get_meta(META_TAG).load_raw().unwrap(),
        storage.get_meta(SYNC_TAG).load_raw().unwrap(),
    ]
}

fn assert_converged(a: &Storage, b: &Storage) {
    assert_eq!(a.load().unwrap(), b.load().unwrap());
    assert_eq!(uuid(a), uuid(b));
    let shared = uuid(a);
    assert_eq!(SyncData::load_for(a).unwrap().location_uuid(a, b), shared);
    assert_eq!(SyncData::load_for(b).unwrap().location_uuid(b, a), shared);
}

#[test]
fn seed_then_update_then_noop() {
    let env = TestEnv::memory();
    let a = env.a.get("settings").unwrap();
    let b = env.b.get("settings").unwrap();
    let config = SyncConfig::new();

    a.store(&Value::text_map([("theme", Value::from("dark"))])).unwrap();
    assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::CopyAToB);
    assert_converged(&a, &b);

    b.store(&Value::text_map([("theme", Value::from("light"))])).unwrap();
    assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::CopyBToA);
    assert_converged(&a, &b);

    assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::Nothing);
    assert_eq!(sync_storage(&b, &a, &config).unwrap(), SyncAction::Nothing);
}

#[test]
fn seed_copy_to_empty_location() {
    let env = TestEnv::memory();
    let a = env.a.get("foo").unwrap();
    let b = env.b.get("foo").unwrap();
    a.store(&Value::from(&b"hello"[..])).unwrap();

    assert_eq!(sync_storage(&a, &b, &SyncConfig::new()).unwrap(), SyncAction::CopyAToB);
    assert_eq!(b.load().unwrap(), Value::Bytes(b"hello".to_vec()));
    assert_eq!(uuid(&a), uuid(&b));
}

#[test]
fn conflict_leaves_both_sides_untouched() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    sync_storage(&a, &b, &SyncConfig::new()).unwrap();

    a.store(&Value::Integer(2)).unwrap();
    b.store(&Value::Integer(3)).unwrap();
    let before = (snapshot(&a), snapshot(&b));

    let err = sync_storage(&a, &b, &SyncConfig::new()).unwrap_err();
    assert!(err.is_conflict());
    let message = err.to_string();
    assert!(message.contains("A: RamStorage(location_a): doc"));
    assert!(message.contains("B: RamStorage(location_b): doc"));
    assert_eq!((snapshot(&a), snapshot(&b)), before);

    // removing one side resolves the conflict
    b.remove().unwrap();
    assert_eq!(sync_storage(&a, &b, &SyncConfig::new()).unwrap(), SyncAction::CopyAToB);
    assert_eq!(b.load().unwrap(), Value::Integer(2));
}

#[test]
fn independently_created_items_need_manual_resolution() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    b.store(&Value::Integer(1)).unwrap();
    let before = (snapshot(&a), snapshot(&b));

    let err = sync_storage(&a, &b, &SyncConfig::new()).unwrap_err();
    assert!(matches!(err, SyncError::MissingSyncRecord { .. }));
    assert!(err.is_conflict());
    assert_eq!((snapshot(&a), snapshot(&b)), before);
}

#[test]
fn one_way_ignores_changes_on_b() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    let one_way = SyncConfig::new().with_only_a_to_b(true);

    b.store(&Value::from("b only")).unwrap();
    assert_eq!(sync_storage(&a, &b, &one_way).unwrap(), SyncAction::Nothing);
    assert!(!a.exists().unwrap());

    a.store(&Value::from("first")).unwrap();
    // no record of B yet, so A differs from its last agreed state
    assert_eq!(sync_storage(&a, &b, &one_way).unwrap(), SyncAction::CopyAToB);
    assert_eq!(b.load().unwrap(), Value::from("first"));

    b.store(&Value::from("edited on b")).unwrap();
    assert_eq!(sync_storage(&a, &b, &one_way).unwrap(), SyncAction::Nothing);
    assert_eq!(b.load().unwrap(), Value::from("edited on b"));

    a.store(&Value::from("second")).unwrap();
    assert_eq!(sync_storage(&a, &b, &one_way).unwrap(), SyncAction::CopyAToB);
    assert_eq!(b.load().unwrap(), Value::from("second"));
}

#[test]
fn one_way_does_not_need_metadata_on_b() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    b.store_raw(b"\xf6").unwrap();

    let one_way = SyncConfig::new().with_only_a_to_b(true);
    assert_eq!(sync_storage(&a, &b, &one_way).unwrap(), SyncAction::CopyAToB);
    assert_converged(&a, &b);

    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    b.store_raw(b"\xf6").unwrap();
    let err = sync_storage(&a, &b, &SyncConfig::new()).unwrap_err();
    assert!(matches!(err, SyncError::MissingMetaData { ref id } if id.contains("location_b")));
}

#[test]
fn dry_run_reports_without_writing() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    let before = (snapshot(&a), snapshot(&b));

    let dry = SyncConfig::new().with_dry_run(true);
    assert_eq!(sync_storage(&a, &b, &dry).unwrap(), SyncAction::CopyAToB);
    assert_eq!(plan(&a, &b, &SyncConfig::new()).unwrap(), SyncAction::CopyAToB);
    assert_eq!((snapshot(&a), snapshot(&b)), before);
}

#[test]
fn partner_records_are_kept_per_location() {
    let registry = appxf_storage::StorageRegistry::new();
    let make = |area: &str| {
        registry
            .create(
                std::sync::Arc::new(appxf_storage::InMemoryBackend::new(area)),
                "doc",
                StorageOptions::new(),
            )
            .unwrap()
    };
    let (a, b, c) = (make("a"), make("b"), make("c"));
    let config = SyncConfig::new();

    a.store(&Value::Integer(1)).unwrap();
    sync_storage(&a, &b, &config).unwrap();
    sync_storage(&a, &c, &config).unwrap();

    let record = SyncData::load_for(&a).unwrap();
    assert_eq!(record.storage_pair_map.len(), 2);
    assert!(record.storage_pair_map.contains_key("--b"));
    assert!(record.storage_pair_map.contains_key("--c"));

    // a change synced to B is still pending for C
    b.store(&Value::Integer(2)).unwrap();
    assert_eq!(sync_storage(&a, &b, &config).unwrap(), SyncAction::CopyBToA);
    assert_eq!(sync_storage(&a, &c, &config).unwrap(), SyncAction::CopyAToB);
    assert_eq!(c.load().unwrap(), Value::Integer(2));
}

#[test]
fn encrypted_locations_sync_without_exposing_content() {
    let env = TestEnv::encrypted();
    let a = env.a.get("vault").unwrap();
    let b = env.b.get("vault").unwrap();
    let secret = Value::from("correct horse battery staple");

    a.store(&secret).unwrap();
    assert_eq!(sync_storage(&a, &b, &SyncConfig::new()).unwrap(), SyncAction::CopyAToB);
    assert_converged(&a, &b);
    assert_eq!(b.load().unwrap(), secret);

    let sealed = b.base().unwrap().load_raw().unwrap();
    assert!(!sealed.windows(5).any(|w| w == b"horse"));
    // metadata stays readable below the layer
    assert_eq!(
        b.base().unwrap().require_meta_data().unwrap().uuid,
        uuid(&b)
    );
}

#[test]
fn local_directories_sync_with_readable_records() {
    let env = TestEnv::local();
    let a = env.a.get("notes").unwrap();
    let b = env.b.get("notes").unwrap();
    a.store(&Value::from("on disk")).unwrap();
    sync_storage(&a, &b, &SyncConfig::new()).unwrap();
    assert_converged(&a, &b);

    let root = env.root().unwrap();
    assert_eq!(
        std::fs::read(root.join("a").join("notes")).unwrap(),
        std::fs::read(root.join("b").join("notes")).unwrap()
    );
    let record = std::fs::read_to_string(root.join("b").join(".meta").join("notes.sync")).unwrap();
    assert!(record.contains("\"storage_pair_map\""));
    assert!(record.contains(&format!("--{}", a.location())));
}

#[test]
fn factory_sync_walks_items_registered_at_a() {
    let env = TestEnv::memory();
    for (name, value) in [("one", 1), ("two", 2)] {
        env.a.get(name).unwrap().store(&Value::Integer(value)).unwrap();
    }
    env.b.get("three").unwrap().store(&Value::Integer(3)).unwrap();

    let report = sync_factories(&env.a, &env.b, &SyncConfig::new()).unwrap();
    assert_eq!(report.copied_a_to_b(), 2);
    let names: Vec<&str> = report.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    assert_eq!(env.b.get("two").unwrap().load().unwrap(), Value::Integer(2));
    assert!(!env.a.get("three").unwrap().exists().unwrap());

    // "three" is now registered at A as well and is picked up
    let report = sync_factories(&env.a, &env.b, &SyncConfig::new()).unwrap();
    assert_eq!(report.copied_b_to_a(), 1);
    assert_eq!(report.unchanged(), 2);
    assert_eq!(env.a.get("three").unwrap().load().unwrap(), Value::Integer(3));
}

#[test]
fn factory_sync_stops_at_first_conflict() {
    let env = TestEnv::memory();
    let a = env.a.get("doc").unwrap();
    let b = env.b.get("doc").unwrap();
    a.store(&Value::Integer(1)).unwrap();
    sync_storage(&a, &b, &SyncConfig::new()).unwrap();
    a.store(&Value::Integer(2)).unwrap();
    b.store(&Value::Integer(3)).unwrap();

    let err = sync_factories(&env.a, &env.b, &SyncConfig::new()).unwrap_err();
    assert!(matches!(err, SyncError::ChangeOnBothSides { .. }));
}

#[derive(Default)]
struct Model {
    exists_a: bool,
    exists_b: bool,
    changed_a: bool,
    changed_b: bool,
    synced: bool,
}

fn run_history(history: Vec<SyncStep>) -> Result<(), TestCaseError> {
    let env = TestEnv::memory();
    let a = env.a.get("item").unwrap();
    let b = env.b.get("item").unwrap();
    let config = SyncConfig::new();
    let mut model = Model::default();

    for step in history {
        match step {
            SyncStep::StoreA(value) => {
                a.store(&value).unwrap();
                model.exists_a = true;
                model.changed_a = true;
            }
            SyncStep::StoreB(value) => {
                b.store(&value).unwrap();
                model.exists_b = true;
                model.changed_b = true;
            }
            SyncStep::Sync => {
                let before = (snapshot(&a), snapshot(&b));
                let result = sync_storage(&a, &b, &config);
                let expected = match (model.exists_a, model.exists_b) {
                    (false, false) => Some(SyncAction::Nothing),
                    (true, false) => Some(SyncAction::CopyAToB),
                    (false, true) => Some(SyncAction::CopyBToA),
                    (true, true) if !model.synced => None,
                    (true, true) => match (model.changed_a, model.changed_b) {
                        (true, true) => None,
                        (true, false) => Some(SyncAction::CopyAToB),
                        (false, true) => Some(SyncAction::CopyBToA),
                        (false, false) => Some(SyncAction::Nothing),
                    },
                };
                match (expected, result) {
                    (Some(expected), Ok(action)) => {
                        prop_assert_eq!(action, expected);
                        if model.exists_a || model.exists_b {
                            assert_converged(&a, &b);
                            prop_assert_eq!(
                                sync_storage(&a, &b, &config).unwrap(),
                                SyncAction::Nothing
                            );
                            model = Model {
                                exists_a: true,
                                exists_b: true,
                                synced: true,
                                ..Model::default()
                            };
                        }
                    }
                    (None, Err(err)) => {
                        prop_assert!(err.is_conflict());
                        prop_assert_eq!((snapshot(&a), snapshot(&b)), before);
                    }
                    (expected, result) => {
                        return Err(TestCaseError::fail(format!(
                            "expected {expected:?}, got {result:?}"
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn histories_follow_the_decision_table(history in sync_history_strategy(12)) {
        run_history(history)?;
    }

    #[test]
    fn any_value_survives_a_sync(value in value_strategy(), name in item_name_strategy()) {
        let env = TestEnv::memory();
        let a = env.a.get(&name).unwrap();
        let b = env.b.get(&name).unwrap();
        a.store(&value).unwrap();
        prop_assert_eq!(sync_storage(&a, &b, &SyncConfig::new()).unwrap(), SyncAction::CopyAToB);
        prop_assert_eq!(b.load().unwrap(), value);
    }
}
