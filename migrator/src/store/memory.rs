// FICHIER : migrator/src/store/memory.rs

use super::{DocumentStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Opération observée par le store mémoire (journal pour tests et diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get(String),
    Upsert(String),
    UpsertDesign(String),
}

#[derive(Debug, Default)]
struct Inner {
    documents: BTreeMap<String, Value>,
    design_documents: BTreeMap<String, Value>,
    journal: Vec<StoreOp>,
    failing: HashSet<StoreOp>,
}

/// Store en mémoire : utilisé par les tests et par `memory://`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Un panic pendant un test ne doit pas bloquer les assertions suivantes.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fait échouer toute opération identique à `op`.
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Écrit directement un document, sans passer par le journal.
    pub fn seed(&self, key: &str, value: Value) {
        self.lock().documents.insert(key.to_string(), value);
    }

    pub fn document(&self, key: &str) -> Option<Value> {
        self.lock().documents.get(key).cloned()
    }

    pub fn design_document(&self, name: &str) -> Option<Value> {
        self.lock().design_documents.get(name).cloned()
    }

    pub fn journal(&self) -> Vec<StoreOp> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Nombre d'écritures (documents + design documents) du journal.
    pub fn write_count(&self) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|op| !matches!(op, StoreOp::Get(_)))
            .count()
    }

    fn record(&self, op: StoreOp) -> StoreResult<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.journal.push(op.clone());
        if inner.failing.contains(&op) {
            return Err(StoreError::Backend(format!("échec simulé : {:?}", op)));
        }
        Ok(inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let inner = self.record(StoreOp::Get(key.to_string()))?;
        inner
            .documents
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn upsert(&self, key: &str, value: &Value) -> StoreResult<()> {
        let mut inner = self.record(StoreOp::Upsert(key.to_string()))?;
        inner.documents.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn upsert_design_document(&self, name: &str, definition: &Value) -> StoreResult<()> {
        let mut inner = self.record(StoreOp::UpsertDesign(name.to_string()))?;
        inner
            .design_documents
            .insert(name.to_string(), definition.clone());
        Ok(())
    }
}
