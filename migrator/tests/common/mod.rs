// FICHIER : migrator/tests/common/mod.rs

#![allow(dead_code)]

use raise_migrate::migrations::{
    Changeset, ChangesetId, ChangesetRegistry, DesignContext, MigrationEngine, RunContext, View,
};
use raise_migrate::store::MemoryStore;
use raise_migrate::utils::Result;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// Comportement de la phase run d'un changeset de test.
#[derive(Clone)]
pub enum Outcome {
    /// Empile les documents puis appelle `done()`.
    Done(Vec<(String, Value)>),
    /// Comme `Done`, mais depuis une tâche tokio séparée.
    DoneLater(Vec<(String, Value)>),
    /// Appelle `error()` avec ce message.
    Fail(String),
    /// Abandonne le contexte sans signal.
    Abandon,
}

/// Changeset scripté : ajoute des vues, puis suit un `Outcome`.
pub struct Scripted {
    views: Vec<(String, String)>,
    removed: Vec<(String, String)>,
    outcome: Outcome,
    runs: Arc<AtomicUsize>,
    designs: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            views: Vec::new(),
            removed: Vec::new(),
            outcome,
            runs: Arc::new(AtomicUsize::new(0)),
            designs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn done() -> Self {
        Self::new(Outcome::Done(Vec::new()))
    }

    pub fn with_view(mut self, design_document: &str, view: &str) -> Self {
        self.views.push((design_document.into(), view.into()));
        self
    }

    pub fn without_view(mut self, design_document: &str, view: &str) -> Self {
        self.removed.push((design_document.into(), view.into()));
        self
    }

    /// Compteur d'appels de la phase run.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }

    /// Compteur d'appels de la phase design (rejeu compris).
    pub fn designs(&self) -> Arc<AtomicUsize> {
        self.designs.clone()
    }
}

fn push_all(ctx: &mut RunContext, docs: Vec<(String, Value)>) -> Result<()> {
    for (id, doc) in docs {
        ctx.push_document(id, doc)?;
    }
    Ok(())
}

impl Changeset for Scripted {
    fn design(&self, ctx: &mut DesignContext<'_>) -> Result<()> {
        self.designs.fetch_add(1, Ordering::SeqCst);
        for (doc, view) in &self.views {
            ctx.push_view(doc, View::new(view).with_map(format!("function (doc) {{ /* {} */ }}", view)));
        }
        for (doc, view) in &self.removed {
            ctx.remove_view(doc, view);
        }
        Ok(())
    }

    fn run(&self, mut ctx: RunContext) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match self.outcome.clone() {
            Outcome::Done(docs) => match push_all(&mut ctx, docs) {
                Ok(()) => ctx.done(),
                Err(e) => ctx.error(e),
            },
            Outcome::DoneLater(docs) => {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    match push_all(&mut ctx, docs) {
                        Ok(()) => ctx.done(),
                        Err(e) => ctx.error(e),
                    }
                });
            }
            Outcome::Fail(message) => ctx.error(anyhow::anyhow!(message)),
            Outcome::Abandon => drop(ctx),
        }
    }
}

pub fn doc(id: &str, value: Value) -> (String, Value) {
    (id.to_string(), value)
}

/// Registre dense `0..n` à partir des changesets fournis.
pub fn registry(changesets: Vec<Scripted>) -> ChangesetRegistry {
    let mut registry = ChangesetRegistry::new();
    for (id, cs) in changesets.into_iter().enumerate() {
        registry
            .register(id as ChangesetId, Arc::new(cs))
            .expect("identifiants uniques");
    }
    registry
}

pub fn engine(store: &Arc<MemoryStore>, changesets: Vec<Scripted>) -> MigrationEngine {
    init_tracing();
    MigrationEngine::new(store.clone(), registry(changesets))
}
