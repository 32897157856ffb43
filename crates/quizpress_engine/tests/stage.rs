mod common;

use std::fs;

use quizpress_engine::{stage_in, MappingSource, StagingError, UploadedFile};
use tempfile::TempDir;

use common::{init_logging, list_names};

fn docx(name: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile::new(name, bytes.to_vec())
}

#[test]
fn stages_inputs_and_uploaded_mapping() {
    init_logging();
    let base = TempDir::new().unwrap();
    let inputs = vec![docx("de_1.docx", b"one"), docx("de_2.docx", b"two")];
    let mapping = MappingSource::Uploaded(UploadedFile::new("ids.xlsx", b"map".to_vec()));

    let workspace = stage_in(base.path(), &inputs, Some(&mapping)).unwrap();

    assert_eq!(list_names(workspace.input_dir()), vec!["de_1.docx", "de_2.docx"]);
    assert_eq!(fs::read(workspace.input_dir().join("de_2.docx")).unwrap(), b"two");
    assert!(list_names(workspace.output_dir()).is_empty());
    let mapping_dir = workspace.mapping_dir().expect("mapping dir set");
    assert_eq!(list_names(mapping_dir), vec!["ids.xlsx"]);
    assert_eq!(fs::read(mapping_dir.join("ids.xlsx")).unwrap(), b"map");
}

#[test]
fn system_default_mapping_is_copied_by_name() {
    init_logging();
    let base = TempDir::new().unwrap();
    let defaults = TempDir::new().unwrap();
    let default_path = defaults.path().join("khoi_12.xlsx");
    fs::write(&default_path, b"default-map").unwrap();

    let workspace = stage_in(
        base.path(),
        &[docx("a.docx", b"a")],
        Some(&MappingSource::SystemDefault(default_path.clone())),
    )
    .unwrap();

    let mapping_dir = workspace.mapping_dir().unwrap();
    assert_eq!(
        fs::read(mapping_dir.join("khoi_12.xlsx")).unwrap(),
        b"default-map"
    );
    // The source file is left in place.
    assert!(default_path.exists());
}

#[test]
fn no_mapping_leaves_mapping_dir_unset() {
    init_logging();
    let base = TempDir::new().unwrap();
    let workspace = stage_in(base.path(), &[docx("a.docx", b"a")], None).unwrap();
    assert!(workspace.mapping_dir().is_none());
}

#[test]
fn duplicate_names_keep_last_write() {
    init_logging();
    let base = TempDir::new().unwrap();
    let inputs = vec![docx("same.docx", b"first"), docx("same.docx", b"second")];
    let workspace = stage_in(base.path(), &inputs, None).unwrap();

    assert_eq!(list_names(workspace.input_dir()), vec!["same.docx"]);
    assert_eq!(
        fs::read(workspace.input_dir().join("same.docx")).unwrap(),
        b"second"
    );
}

#[test]
fn workspaces_are_unique_and_removed_on_drop() {
    init_logging();
    let base = TempDir::new().unwrap();
    let first = stage_in(base.path(), &[], None).unwrap();
    let second = stage_in(base.path(), &[], None).unwrap();
    assert_ne!(first.root(), second.root());
    assert_ne!(first.id(), second.id());
    assert_eq!(list_names(base.path()).len(), 2);

    let first_root = first.root().to_path_buf();
    drop(first);
    assert!(!first_root.exists());
    second.close().unwrap();
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn failed_staging_leaves_nothing_behind() {
    init_logging();
    let base = TempDir::new().unwrap();
    let missing = base.path().join("gone.xlsx");

    let err = stage_in(
        base.path(),
        &[docx("a.docx", b"a")],
        Some(&MappingSource::SystemDefault(missing)),
    )
    .unwrap_err();

    assert!(matches!(err, StagingError::CopyMapping { .. }));
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn unusable_upload_name_is_a_staging_error() {
    init_logging();
    let base = TempDir::new().unwrap();
    let err = stage_in(base.path(), &[docx("..", b"x")], None).unwrap_err();
    assert!(matches!(err, StagingError::InvalidName(_)));
    assert!(list_names(base.path()).is_empty());
}

#[test]
fn missing_base_directory_fails_to_create_workspace() {
    init_logging();
    let base = TempDir::new().unwrap();
    let err = stage_in(&base.path().join("nope"), &[], None).unwrap_err();
    assert!(matches!(err, StagingError::CreateWorkspace(_)));
}
