// FICHIER : migrator/tests/migration_suite/engine_failures.rs

use crate::common::{doc, engine, init_tracing, Outcome, Scripted};
use raise_migrate::migrations::{ChangesetRegistry, EnginePhase, MigrationEngine};
use raise_migrate::store::{MemoryStore, StoreOp};
use raise_migrate::utils::config::{PersistPolicy, DEFAULT_STATE_KEY};
use raise_migrate::utils::AppError;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn failed_flush_stops_the_run() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on(StoreOp::Upsert("c".into()));

    let cs2 = Scripted::new(Outcome::Done(vec![doc("d", json!({}))]));
    let runs2 = cs2.runs();
    let mut engine = engine(
        &store,
        vec![
            Scripted::new(Outcome::Done(vec![doc("a", json!({}))])),
            Scripted::new(Outcome::Done(vec![doc("b", json!({})), doc("c", json!({}))])),
            cs2,
        ],
    );

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, AppError::DocumentUpsert { ref id, .. } if id == "c"));

    assert_eq!(runs2.load(Ordering::SeqCst), 0);
    assert_eq!(engine.phase(), EnginePhase::Failed);
    assert_eq!(engine.pending_documents(), 0);
    assert!(store.document("a").is_some());
    assert!(store.document("d").is_none());
    assert!(store.document(DEFAULT_STATE_KEY).is_none());
}

#[tokio::test]
async fn checkpoints_survive_a_later_failure_and_resume() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on(StoreOp::Upsert("c".into()));

    let cs0 = Scripted::new(Outcome::Done(vec![doc("a", json!({}))]));
    let cs1 = Scripted::new(Outcome::Done(vec![doc("b", json!({}))]));
    let cs2 = Scripted::new(Outcome::Done(vec![doc("c", json!({}))]));
    let runs: Vec<_> = [&cs0, &cs1, &cs2].iter().map(|cs| cs.runs()).collect();

    let mut engine =
        engine(&store, vec![cs0, cs1, cs2]).with_persist_policy(PersistPolicy::AfterEachChangeset);

    assert!(engine.run().await.is_err());
    assert_eq!(store.document(DEFAULT_STATE_KEY).unwrap()["lastAppliedId"], 1);

    store.clear_failures();
    let report = engine.run().await.unwrap();

    assert_eq!(report.replayed, 2);
    assert_eq!(report.applied, vec![2]);
    let counts: Vec<_> = runs.iter().map(|r| r.load(Ordering::SeqCst)).collect();
    assert_eq!(counts, vec![1, 1, 2]);
    assert_eq!(store.document(DEFAULT_STATE_KEY).unwrap()["lastAppliedId"], 2);
}

#[tokio::test]
async fn signaled_error_aborts_before_commit() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = engine(
        &store,
        vec![
            Scripted::new(Outcome::Done(vec![doc("a", json!({}))])).with_view("d1", "v1"),
            Scripted::new(Outcome::Fail("boom".into())).with_view("d1", "v2"),
        ],
    );

    match engine.run().await {
        Err(AppError::ChangesetSignaled { id, source }) => {
            assert_eq!(id, 1);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("erreur signalée attendue, obtenu {:?}", other.map(|r| r.applied)),
    }

    // La vue v2 n'a jamais été publiée.
    let d1 = store.design_document("d1").unwrap();
    assert!(d1["views"].get("v2").is_none());
    assert!(store.document(DEFAULT_STATE_KEY).is_none());
}

#[tokio::test]
async fn dropped_context_is_detected() {
    let store = Arc::new(MemoryStore::new());
    let mut engine = engine(&store, vec![Scripted::new(Outcome::Abandon)]);

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, AppError::ChangesetAbandoned(0)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn cursor_write_failure_is_reported() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on(StoreOp::Upsert(DEFAULT_STATE_KEY.into()));
    let mut engine = engine(
        &store,
        vec![Scripted::new(Outcome::Done(vec![doc("a", json!({}))]))],
    );

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, AppError::CursorPersist(_)));
    // Les documents ont déjà été écrits : ils seront réécrits à la prochaine exécution.
    assert!(store.document("a").is_some());
}

#[tokio::test]
async fn unreadable_cursor_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on(StoreOp::Get(DEFAULT_STATE_KEY.into()));

    let cs0 = Scripted::done();
    let runs0 = cs0.runs();
    let mut engine = engine(&store, vec![cs0]);

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, AppError::StoreFetch(_)));
    assert_eq!(runs0.load(Ordering::SeqCst), 0);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn malformed_cursor_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.seed(DEFAULT_STATE_KEY, json!({"lastAppliedId": "deux"}));

    let err = engine(&store, vec![Scripted::done()]).run().await.unwrap_err();
    assert!(matches!(err, AppError::StoreFetch(_)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn gap_in_registry_is_fatal_when_reached() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());

    let mut registry = ChangesetRegistry::new();
    registry
        .register(0, Arc::new(Scripted::new(Outcome::Done(vec![doc("a", json!({}))]))))
        .unwrap();
    registry.register(2, Arc::new(Scripted::done())).unwrap();
    assert_eq!(registry.missing_ids(), vec![1]);

    let mut engine = MigrationEngine::new(store.clone(), registry);
    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, AppError::MissingChangeset(1)));
    assert!(store.document("a").is_some());
    assert!(store.document(DEFAULT_STATE_KEY).is_none());
}

#[tokio::test]
async fn cursor_beyond_registry_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.seed(DEFAULT_STATE_KEY, json!({"lastAppliedId": 5}));

    let err = engine(&store, vec![Scripted::done(), Scripted::done()])
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MissingChangeset(2)));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn design_publish_failure_skips_documents() {
    let store = Arc::new(MemoryStore::new());
    store.fail_on(StoreOp::UpsertDesign("d1".into()));
    let mut engine = engine(
        &store,
        vec![Scripted::new(Outcome::Done(vec![doc("a", json!({}))])).with_view("d1", "v1")],
    );

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, AppError::IndexUpsert { ref name, .. } if name == "d1"));
    assert!(store.document("a").is_none());
    assert_eq!(engine.pending_documents(), 0);
}
