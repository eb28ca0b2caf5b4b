//! Use case and metadata files on disk, through to the dependency forest.

use std::fs;

use btp_provisioner::domain::{
    AccountContext, DefinitionId, DependencyForest, ExecutionStatus, Kind,
};
use btp_provisioner::error::{ConfigError, Error};
use btp_provisioner::infrastructure::usecase::{load_metadata, load_usecase, write_metadata};
use serde_json::json;
use tempfile::tempdir;

const USECASE: &str = r#"{
    "aboutThisUseCase": {"name": "Task Center", "author": "someone"},
    "services": [
        {"name": "workflow", "category": "SERVICE", "plan": "standard",
         "instancename": "wf-instance", "parameters": {"admin": true}},
        {"name": "taskcenter", "category": "APPLICATION", "plan": "standard",
         "requiredApplications": ["workzone"]},
        {"name": "workzone", "category": "APPLICATION", "plan": "standard"},
        {"name": "destination", "category": "SERVICE", "plan": "lite",
         "requiredServices": ["workflow"], "entitleonly": false}
    ]
}"#;

#[test]
fn usecase_file_builds_a_forest() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("usecase.json");
    fs::write(&path, USECASE).expect("write use case");

    let registry = load_usecase(&path).expect("use case should load");
    let forest = DependencyForest::build(&registry).expect("forest should build");

    let taskcenter = registry.find(Kind::Application, "taskcenter").unwrap();
    let workzone = registry.find(Kind::Application, "workzone").unwrap();
    let workflow = registry.find(Kind::Service, "workflow").unwrap();

    let workzone_node = forest.locate(workzone).unwrap();
    assert_eq!(
        forest.parent(workzone_node).map(|node| forest.definition(node)),
        Some(taskcenter)
    );
    assert_eq!(forest.walk().len(), registry.len());
    assert_eq!(registry.get(workflow).unwrap().instance_name(), "wf-instance");
    assert!(registry
        .iter()
        .all(|(_, def)| def.execution_status == ExecutionStatus::Pending));
}

#[test]
fn unknown_reference_fails_when_building_the_forest() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("usecase.json");
    fs::write(
        &path,
        r#"{"services": [{"name": "a", "category": "APPLICATION", "requiredApplications": ["ghost"]}]}"#,
    )
    .expect("write use case");

    let registry = load_usecase(&path).expect("references are checked later");
    match DependencyForest::build(&registry) {
        Err(ConfigError::UnresolvedDependency { dependency, .. }) => assert_eq!(dependency, "ghost"),
        other => panic!("expected unresolved dependency, got {other:?}"),
    }
}

#[test]
fn self_reference_is_rejected_on_load() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("usecase.json");
    fs::write(
        &path,
        r#"{"services": [{"name": "db", "category": "SERVICE", "requiredServices": ["db"]}]}"#,
    )
    .expect("write use case");

    assert!(matches!(
        load_usecase(&path),
        Err(Error::Config(ConfigError::SelfReference { .. }))
    ));
}

#[test]
fn metadata_round_trips_through_disk() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("metadata.json");
    fs::write(
        &path,
        json!({"subaccountid": "0a1b2c", "global": {"region": "eu10"}}).to_string(),
    )
    .expect("write metadata");

    let metadata = load_metadata(&path).expect("metadata should load");
    let account = AccountContext::from_metadata(&metadata).expect("subaccount present");
    assert_eq!(account.subaccount_id, "0a1b2c");

    let output = dir.path().join("out.json");
    write_metadata(&output, &metadata).expect("write metadata");
    let written = fs::read_to_string(&output).expect("read back");
    assert!(written.ends_with('\n'));
    assert_eq!(load_metadata(&output).unwrap(), metadata);
}

#[test]
fn metadata_without_subaccount_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("metadata.json");
    fs::write(&path, r#"{"subaccountid": "  "}"#).expect("write metadata");

    let metadata = load_metadata(&path).expect("metadata should load");
    assert!(matches!(
        AccountContext::from_metadata(&metadata),
        Err(ConfigError::MissingField { field: "subaccountid" })
    ));
}

#[test]
fn keys_are_stable_in_declaration_order() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("usecase.json");
    fs::write(&path, USECASE).expect("write use case");

    let registry = load_usecase(&path).unwrap();
    let names: Vec<_> = registry.ids().map(|id| registry.get(id).unwrap().name.clone()).collect();

    assert_eq!(names, vec!["taskcenter", "workzone", "workflow", "destination"]);
    assert_eq!(registry.find(Kind::Service, "destination"), Some(DefinitionId::service(1)));
}
