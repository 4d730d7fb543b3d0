//! Tests for the rule-set store and settings files.

use std::fs;
use std::path::PathBuf;

use hl7_config::{ConfigError, ConfigStore, MonitorSettings, load_settings, save_settings};
use hl7_model::{Action, Rule, RuleSet};
use serde_json::{Value, json};

fn delete_nte() -> RuleSet {
    RuleSet::new(vec![Rule::Single(Action::DeleteSegment {
        segment: "NTE".to_string(),
    })])
}

#[test]
fn missing_store_loads_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = ConfigStore::load(dir.path().join("configurations.json")).expect("load");
    assert!(store.is_empty());
}

#[test]
fn saved_store_loads_back() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("configurations.json");

    let mut store = ConfigStore::new(&path);
    store.insert("lab", &delete_nte()).expect("insert");
    store.insert("adt", &RuleSet::default()).expect("insert");
    store.save().expect("save");

    let loaded = ConfigStore::load(&path).expect("load");
    assert_eq!(loaded.names().collect::<Vec<_>>(), ["adt", "lab"]);
    assert_eq!(*loaded.rule_set("lab").expect("rule set"), delete_nte());
    assert_eq!(loaded, store);
}

#[test]
fn import_merges_and_replaces_existing_names() {
    let dir = tempfile::tempdir().expect("temp dir");
    let export_path = dir.path().join("export.json");

    let mut source = ConfigStore::new(dir.path().join("a.json"));
    source.insert("lab", &delete_nte()).expect("insert");
    source.export_to(&export_path).expect("export");

    let mut target = ConfigStore::new(dir.path().join("b.json"));
    target.insert("lab", &RuleSet::default()).expect("insert");
    target.insert("adt", &RuleSet::default()).expect("insert");
    let imported = target.import_from(&export_path).expect("import");

    assert_eq!(imported, ["lab"]);
    assert_eq!(target.len(), 2);
    assert_eq!(*target.rule_set("lab").expect("rule set"), delete_nte());
}

#[test]
fn import_and_save_keep_entries_that_do_not_parse() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store_path = dir.path().join("configurations.json");
    fs::write(
        &store_path,
        r#"{
            "lab": [
                {"action": "future_op", "segment": "PID"},
                {"action": "delete_segment", "segment": "NTE"}
            ],
            "other": {"rules": []}
        }"#,
    )
    .expect("write store");
    let import_path = dir.path().join("import.json");
    fs::write(&import_path, r#"{"adt": []}"#).expect("write import");

    let mut store = ConfigStore::load(&store_path).expect("load");
    store.import_from(&import_path).expect("import");
    store.save().expect("save");

    let saved: Value =
        serde_json::from_str(&fs::read_to_string(&store_path).expect("read")).expect("json");
    assert_eq!(
        saved,
        json!({
            "adt": [],
            "lab": [
                {"action": "future_op", "segment": "PID"},
                {"action": "delete_segment", "segment": "NTE"}
            ],
            "other": {"rules": []}
        })
    );
    assert_eq!(store.rule_set("lab").expect("rule set").len(), 1);
}

#[test]
fn importing_a_missing_file_imports_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = ConfigStore::new(dir.path().join("store.json"));
    store.insert("adt", &RuleSet::default()).expect("insert");

    let imported = store
        .import_from(&dir.path().join("missing.json"))
        .expect("import");
    assert!(imported.is_empty());
    assert_eq!(store.len(), 1);
}

#[test]
fn invalid_json_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("configurations.json");
    fs::write(&path, "{ not json").expect("write");
    assert!(matches!(
        ConfigStore::load(&path),
        Err(ConfigError::Json { .. })
    ));
}

#[test]
fn legacy_action_names_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("configurations.json");
    fs::write(
        &path,
        r#"{"pv1": [{"action": "agregar_campos", "segment": "PV1", "values": ["x"], "start_index": null}]}"#,
    )
    .expect("write");

    let store = ConfigStore::load(&path).expect("load");
    let rules = store.rule_set("pv1").expect("rule set");
    assert_eq!(rules.len(), 1);
    assert_eq!(rules.rules()[0].actions()[0].name(), "insert_fields");
}

#[test]
fn unknown_rule_set_name_is_an_error() {
    let store = ConfigStore::new("unused.json");
    let err = store.rule_set("missing").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownConfig { name } if name == "missing"));
}

#[test]
fn settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("settings.toml");
    assert_eq!(load_settings(&path), MonitorSettings::default());

    fs::write(&path, "workers = \"many\"").expect("write");
    assert_eq!(load_settings(&path), MonitorSettings::default());
}

#[test]
fn settings_save_and_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("settings.toml");
    let settings = MonitorSettings {
        input_dir: Some(PathBuf::from("/data/in")),
        output_dir: Some(PathBuf::from("/data/out")),
        backup_dir: Some(PathBuf::from("/data/backup")),
        active_config: Some("lab".to_string()),
        workers: 2,
        ..MonitorSettings::default()
    };
    save_settings(&settings, &path).expect("save");
    assert_eq!(load_settings(&path), settings);
}
