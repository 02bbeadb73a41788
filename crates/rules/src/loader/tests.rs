//! Tests for the rule loader module.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::schema::{BlockRules, IgnoreRules};

const IGNORE_JSON: &str = r#"{"namespace_patterns": ["kube-*"], "resource_kind_patterns": ["Event"]}"#;
const BLOCK_JSON: &str = r#"{
  "namespace_patterns": ["production"],
  "operation_patterns": ["DELETE"],
  "message": "production deletes are frozen"
}"#;

fn temp_loader() -> (TempDir, RuleLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleLoader::new(dir.path().to_path_buf(), Arc::new(RuleStore::default()));
    (dir, loader)
}

#[test]
fn reload_reads_both_documents() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join(IGNORE_CONFIG_FILE), IGNORE_JSON).unwrap();
    fs::write(dir.path().join(BLOCK_CONFIG_FILE), BLOCK_JSON).unwrap();

    let report = loader.reload();
    assert_eq!(report.ignore, ReloadOutcome::Updated);
    assert_eq!(report.block, ReloadOutcome::Updated);

    let snap = loader.store().snapshot();
    assert_eq!(snap.ignore.unwrap().namespace_patterns, vec!["kube-*"]);
    let block = snap.block.unwrap();
    assert_eq!(block.operation_patterns, vec!["DELETE"]);
    assert_eq!(block.message, "production deletes are frozen");
}

#[test]
fn missing_files_keep_current_rules() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RuleStore::new(
        Some(IgnoreRules {
            name_patterns: vec!["inline".to_string()],
            ..Default::default()
        }),
        None,
    ));
    let loader = RuleLoader::new(dir.path().to_path_buf(), Arc::clone(&store));

    let report = loader.reload();
    assert_eq!(report.ignore, ReloadOutcome::Missing);
    assert_eq!(report.block, ReloadOutcome::Missing);
    assert_eq!(store.ignore().unwrap().name_patterns, vec!["inline"]);
    assert!(store.block().is_none());
}

#[test]
fn parse_error_keeps_previous_version() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join(BLOCK_CONFIG_FILE);
    fs::write(&path, BLOCK_JSON).unwrap();
    loader.reload();

    fs::write(&path, r#"{"namespace_patterns": "#).unwrap();
    let report = loader.reload();
    assert!(matches!(report.block, ReloadOutcome::Kept { .. }));

    let block = loader.store().block().unwrap();
    assert_eq!(block.namespace_patterns, vec!["production"]);
}

#[test]
fn deleting_a_file_does_not_clear_rules() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join(IGNORE_CONFIG_FILE);
    fs::write(&path, IGNORE_JSON).unwrap();
    loader.reload();

    fs::remove_file(&path).unwrap();
    assert_eq!(loader.reload().ignore, ReloadOutcome::Missing);
    assert!(loader.store().ignore().is_some());
}

#[test]
fn identical_content_is_unchanged() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join(IGNORE_CONFIG_FILE), IGNORE_JSON).unwrap();
    assert_eq!(loader.reload().ignore, ReloadOutcome::Updated);

    let before = loader.store().ignore().unwrap();
    assert_eq!(loader.reload().ignore, ReloadOutcome::Unchanged);
    // the same Arc is still installed
    assert!(Arc::ptr_eq(&before, &loader.store().ignore().unwrap()));
}

#[test]
fn yaml_documents_are_accepted() {
    let (dir, loader) = temp_loader();
    fs::write(
        dir.path().join(BLOCK_CONFIG_FILE),
        "resource_kind_patterns:\n  - Namespace\noperation_patterns:\n  - delete\n",
    )
    .unwrap();
    assert_eq!(loader.reload().block, ReloadOutcome::Updated);
    assert_eq!(
        *loader.store().block().unwrap(),
        BlockRules {
            resource_kind_patterns: vec!["Namespace".to_string()],
            operation_patterns: vec!["delete".to_string()],
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn reloader_picks_up_changes_and_stops() {
    let (dir, loader) = temp_loader();
    let loader = Arc::new(loader);
    let (tx, rx) = tokio::sync::watch::channel(false);

    let handle = spawn_reloader(Arc::clone(&loader), Duration::from_millis(20), rx);

    fs::write(dir.path().join(IGNORE_CONFIG_FILE), IGNORE_JSON).unwrap();
    let mut picked_up = false;
    for _ in 0..100 {
        if loader.store().ignore().is_some() {
            picked_up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(picked_up, "reloader never swapped in the ignore rules");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("reloader stops on shutdown")
        .unwrap();
}
