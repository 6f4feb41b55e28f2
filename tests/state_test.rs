use icd_provider::state::{fingerprint, ResourceState, StateFile, StateStore, UserRecord};
use icd_provider::validation::{DatabaseUser, UserType};
use tempfile::TempDir;

fn record(name: &str) -> UserRecord {
    UserRecord::from_user(&DatabaseUser::new(name, "Password12345", UserType::Database))
}

#[test]
fn test_missing_state_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("icd-state.json"));

    let state = store.load().unwrap();
    assert_eq!(state.version, 1);
    assert!(state.resources.is_empty());
}

#[test]
fn test_record_replaces_one_resource() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::new(dir.path().join("nested").join("icd-state.json"));

    store
        .record(
            "ibm_database.redis",
            ResourceState {
                instance_id: "deployment-1".to_string(),
                users: vec![record("app")],
                ..Default::default()
            },
        )
        .unwrap();
    store
        .record(
            "ibm_database.pg",
            ResourceState {
                instance_id: "deployment-2".to_string(),
                admin_password: Some(fingerprint(&["admin", "AdminPassword123"])),
                ..Default::default()
            },
        )
        .unwrap();
    store
        .record(
            "ibm_database.redis",
            ResourceState {
                instance_id: "deployment-1".to_string(),
                users: vec![record("app"), record("reporting")],
                ..Default::default()
            },
        )
        .unwrap();

    let state = store.load().unwrap();
    assert_eq!(state.resources.len(), 2);
    let redis = &state.resources["ibm_database.redis"];
    assert_eq!(redis.users.len(), 2);
    assert!(redis.user("database", "reporting").is_some());
    assert!(redis.user("ops_manager", "reporting").is_none());
    assert!(!redis.updated_at.is_empty());

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("Password12345"));
    assert!(!raw.contains("AdminPassword123"));
}

#[test]
fn test_corrupt_state_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("icd-state.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = StateStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("Failed to parse state file"));
}

#[test]
fn test_newer_state_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("icd-state.json");
    std::fs::write(&path, r#"{"version": 99, "resources": {}}"#).unwrap();

    let err = StateStore::new(&path).load().unwrap_err();
    assert!(err.to_string().contains("newer than supported version 1"));
}

#[test]
fn test_fingerprint_separates_fields() {
    assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
    assert_eq!(fingerprint(&["a"]).len(), 64);

    let plain = record("app");
    let with_role = UserRecord::from_user(
        &DatabaseUser::new("app", "Password12345", UserType::Database).with_role("+@read"),
    );
    assert_ne!(plain.fingerprint, with_role.fingerprint);
    assert_eq!(StateFile::default().version, 1);
}
