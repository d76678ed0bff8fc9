// FICHIER : migrator/tests/migration_suite/file_changesets.rs

use crate::common::init_tracing;
use raise_migrate::migrations::{ChangesetRegistry, MigrationEngine};
use raise_migrate::store::{DocumentStore, FileStore};
use raise_migrate::utils::config::{MigrateConfig, DEFAULT_STATE_KEY};
use raise_migrate::utils::AppError;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(path: &Path, content: &Value) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, serde_json::to_string_pretty(content).unwrap()).unwrap();
}

/// Deux changesets : création de vues et de données, puis retrait d'une vue.
fn seed_changesets(dir: &Path) {
    write(
        &dir.join("0000-init.json"),
        &json!({
            "id": "0",
            "description": "Vues et réglages initiaux",
            "design": [
                { "op": "pushView", "designDocument": "users", "view": "by_email",
                  "map": "function (doc, meta) { emit(doc.email, null); }" },
                { "op": "pushView", "designDocument": "users", "view": "by_name",
                  "map": "function (doc, meta) { emit(doc.name, null); }",
                  "reduce": "_count" }
            ],
            "run": [
                { "op": "pushDocument", "id": "settings", "document": { "theme": "dark" } },
                { "op": "pushDocumentWithId", "file": "seed/admin.json" },
                { "op": "log", "message": "Données initiales prêtes" }
            ]
        }),
    );
    write(
        &dir.join("seed/admin.json"),
        &json!({ "id": "user::admin", "name": "admin", "email": "admin@example.org" }),
    );
    write(
        &dir.join("0001-drop-name-view.json"),
        &json!({
            "id": 1,
            "design": [
                { "op": "removeView", "designDocument": "users", "view": "by_name" }
            ],
            "run": []
        }),
    );
}

fn file_config(changesets: &Path, db_root: &Path) -> MigrateConfig {
    MigrateConfig {
        changesets_dir: changesets.to_path_buf(),
        server: format!("file://{}", db_root.display()),
        bucket: "app".to_string(),
        ..MigrateConfig::default()
    }
}

#[tokio::test]
async fn directory_of_changesets_against_file_store() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let changesets = tmp.path().join("changesets");
    seed_changesets(&changesets);

    let store = Arc::new(FileStore::new(tmp.path().join("db"), "app"));
    let registry = ChangesetRegistry::from_dir(&changesets).unwrap();
    let mut engine = MigrationEngine::new(store.clone(), registry);

    let report = engine.run().await.unwrap();
    assert_eq!(report.applied, vec![0, 1]);
    assert_eq!(report.documents_saved, 2);

    assert_eq!(store.get("settings").await.unwrap(), json!({"theme": "dark"}));
    assert_eq!(store.get("user::admin").await.unwrap()["name"], "admin");
    assert_eq!(
        store.get(DEFAULT_STATE_KEY).await.unwrap()["lastAppliedId"],
        1
    );

    let raw = std::fs::read_to_string(store.design_document_path("users")).unwrap();
    let users: Value = serde_json::from_str(&raw).unwrap();
    assert!(users["views"]["by_email"]["map"].is_string());
    assert!(users["views"].get("by_name").is_none());
}

#[tokio::test]
async fn run_from_config_is_idempotent() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let changesets = tmp.path().join("changesets");
    seed_changesets(&changesets);
    let config = file_config(&changesets, &tmp.path().join("db"));

    let first = raise_migrate::run_from_config(&config).await.unwrap();
    assert_eq!(first.applied, vec![0, 1]);

    let second = raise_migrate::run_from_config(&config).await.unwrap();
    assert!(second.applied.is_empty());
    assert_eq!(second.replayed, 2);
    assert_eq!(second.design_documents_saved, 0);

    // Un nouveau changeset ajouté plus tard est le seul exécuté.
    write(
        &changesets.join("0002-more.json"),
        &json!({
            "id": 2,
            "run": [ { "op": "pushDocument", "id": "feature-flags", "document": { "beta": true } } ]
        }),
    );
    let third = raise_migrate::run_from_config(&config).await.unwrap();
    assert_eq!(third.applied, vec![2]);
    assert_eq!(third.documents_saved, 1);
}

#[tokio::test]
async fn missing_payload_file_is_signaled_by_changeset() {
    init_tracing();
    let tmp = TempDir::new().unwrap();
    let changesets = tmp.path().join("changesets");
    write(
        &changesets.join("0000.json"),
        &json!({
            "id": 0,
            "run": [ { "op": "pushDocumentWithId", "file": "absent.json" } ]
        }),
    );
    let config = file_config(&changesets, &tmp.path().join("db"));

    let err = raise_migrate::run_from_config(&config).await.unwrap_err();
    assert!(matches!(err, AppError::ChangesetSignaled { id: 0, .. }));

    let store = FileStore::new(tmp.path().join("db"), "app");
    assert!(store.get(DEFAULT_STATE_KEY).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn invalid_configuration_is_rejected_early() {
    let tmp = TempDir::new().unwrap();
    let mut config = file_config(tmp.path(), tmp.path());
    config.bucket = String::new();
    assert!(matches!(
        raise_migrate::run_from_config(&config).await,
        Err(AppError::Config(_))
    ));

    let config = MigrateConfig {
        server: "memory://".to_string(),
        bucket: "b".to_string(),
        changesets_dir: tmp.path().join("absent"),
        ..MigrateConfig::default()
    };
    assert!(matches!(
        raise_migrate::run_from_config(&config).await,
        Err(AppError::Config(_))
    ));
}

#[tokio::test]
async fn memory_backend_runs_directory() {
    let tmp = TempDir::new().unwrap();
    seed_changesets(tmp.path());
    let config = MigrateConfig {
        server: "memory://".to_string(),
        bucket: "b".to_string(),
        changesets_dir: tmp.path().to_path_buf(),
        ..MigrateConfig::default()
    };

    let report = raise_migrate::run_from_config(&config).await.unwrap();
    assert_eq!(report.applied, vec![0, 1]);
    assert_eq!(report.state.last_applied_id, 1);
}
