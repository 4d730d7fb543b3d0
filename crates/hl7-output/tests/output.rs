//! Tests for output writing and backup relocation.

use std::fs;

use hl7_output::{OutputError, backup_path, move_to_backup, write_atomic};

#[test]
fn move_to_backup_keeps_name_and_contents() {
    let root = tempfile::tempdir().expect("temp dir");
    let original = root.path().join("in").join("adt.hl7");
    fs::create_dir_all(original.parent().expect("parent")).expect("create in");
    fs::write(&original, "MSH|A\nPID|1\n").expect("write original");
    let backup_dir = root.path().join("backup");

    let moved = move_to_backup(&original, &backup_dir).expect("move");
    assert_eq!(moved, backup_dir.join("adt.hl7"));
    assert!(!original.exists());
    assert_eq!(fs::read_to_string(&moved).expect("read"), "MSH|A\nPID|1\n");
}

#[test]
fn existing_backup_is_never_overwritten() {
    let root = tempfile::tempdir().expect("temp dir");
    let backup_dir = root.path().join("backup");
    fs::create_dir(&backup_dir).expect("create backup");
    fs::write(backup_dir.join("adt.hl7"), "old").expect("write old backup");
    let original = root.path().join("adt.hl7");
    fs::write(&original, "new").expect("write original");

    assert!(matches!(
        backup_path(&original, &backup_dir),
        Err(OutputError::BackupCollision { .. })
    ));
    let err = move_to_backup(&original, &backup_dir).unwrap_err();
    assert!(matches!(err, OutputError::BackupCollision { ref path } if *path == backup_dir.join("adt.hl7")));
    assert_eq!(fs::read_to_string(&original).expect("read"), "new");
    assert_eq!(fs::read_to_string(backup_dir.join("adt.hl7")).expect("read"), "old");
}

#[test]
fn missing_original_reports_move_failure() {
    let root = tempfile::tempdir().expect("temp dir");
    let err = move_to_backup(&root.path().join("gone.hl7"), root.path()).unwrap_err();
    assert!(matches!(err, OutputError::Io { operation: "move", .. }));
}

#[test]
fn atomic_write_then_backup_round() {
    let root = tempfile::tempdir().expect("temp dir");
    let original = root.path().join("oru.hl7");
    fs::write(&original, "MSH|A\n").expect("write original");
    let output = root.path().join("out").join("oru.hl7");

    write_atomic(&output, "MSH|B\n").expect("write output");
    move_to_backup(&original, &root.path().join("backup")).expect("backup");

    assert_eq!(fs::read_to_string(&output).expect("read"), "MSH|B\n");
    assert!(root.path().join("backup").join("oru.hl7").exists());
}
