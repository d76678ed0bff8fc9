// FICHIER : migrator/src/migrations/engine.rs

use super::batch::DocumentBatch;
use super::changeset::ChangesetId;
use super::context::{DesignContext, RunContext};
use super::design::DesignDocument;
use super::registry::ChangesetRegistry;
use super::state::{MigrationState, StateStore};
use crate::store::DocumentStore;
use crate::utils::config::DEFAULT_STATE_KEY;
use crate::utils::prelude::*;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Écritures de documents lancées en parallèle lors d'un flush.
const FLUSH_CONCURRENCY: usize = 16;

/// Phase courante du moteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "changeset", rename_all = "camelCase")]
pub enum EnginePhase {
    Idle,
    Initializing,
    Replaying,
    Designing(ChangesetId),
    Running(ChangesetId),
    Committing(ChangesetId),
    Persisting,
    Done,
    Failed,
}

/// Bilan d'une exécution réussie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub run_id: Uuid,
    /// Nombre de changesets dont la phase design a été rejouée.
    pub replayed: u64,
    pub applied: Vec<ChangesetId>,
    pub design_documents_saved: usize,
    pub documents_saved: usize,
    pub state: MigrationState,
}

/// Orchestrateur : rejoue l'historique, puis applique les changesets en attente un par un.
pub struct MigrationEngine {
    store: Arc<dyn DocumentStore>,
    state_store: StateStore,
    registry: ChangesetRegistry,
    policy: PersistPolicy,
    design_documents: BTreeMap<String, DesignDocument>,
    batch: DocumentBatch,
    phase: EnginePhase,
}

impl MigrationEngine {
    pub fn new(store: Arc<dyn DocumentStore>, registry: ChangesetRegistry) -> Self {
        Self {
            state_store: StateStore::new(store.clone(), DEFAULT_STATE_KEY),
            store,
            registry,
            policy: PersistPolicy::default(),
            design_documents: BTreeMap::new(),
            batch: DocumentBatch::new(),
            phase: EnginePhase::Idle,
        }
    }

    pub fn from_config(
        config: &MigrateConfig,
        store: Arc<dyn DocumentStore>,
        registry: ChangesetRegistry,
    ) -> Self {
        Self::new(store, registry)
            .with_state_key(&config.state_key)
            .with_persist_policy(config.persist_policy)
    }

    pub fn with_state_key(mut self, key: &str) -> Self {
        self.state_store = StateStore::new(self.store.clone(), key);
        self
    }

    pub fn with_persist_policy(mut self, policy: PersistPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn design_document(&self, name: &str) -> Option<&DesignDocument> {
        self.design_documents.get(name)
    }

    pub fn design_documents(&self) -> impl Iterator<Item = &DesignDocument> {
        self.design_documents.values()
    }

    /// Documents en attente d'écriture (toujours vide hors d'une exécution).
    pub fn pending_documents(&self) -> usize {
        self.batch.len()
    }

    /// Exécute toutes les migrations en attente.
    ///
    /// Le modèle d'index est reconstruit à chaque appel : le moteur peut être relancé.
    pub async fn run(&mut self) -> Result<MigrationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("migration", run_id = %run_id);

        let result = self.execute(run_id).instrument(span).await;
        match &result {
            Ok(report) => {
                self.phase = EnginePhase::Done;
                info!(
                    run_id = %run_id,
                    applied = report.applied.len(),
                    last_applied_id = report.state.last_applied_id,
                    "✅ Migration terminée"
                );
            }
            Err(e) => {
                self.phase = EnginePhase::Failed;
                self.batch.clear();
                error!(run_id = %run_id, error = %e, "❌ Migration interrompue");
            }
        }
        result
    }

    async fn execute(&mut self, run_id: Uuid) -> Result<MigrationReport> {
        self.design_documents.clear();
        self.batch.clear();

        self.phase = EnginePhase::Initializing;
        let mut state = self.state_store.load().await?;
        info!(
            last_applied_id = state.last_applied_id,
            registered = self.registry.len(),
            "État de migration chargé"
        );

        self.phase = EnginePhase::Replaying;
        let replayed = self.replay(state.last_applied_id)?;

        let mut report = MigrationReport {
            run_id,
            replayed,
            applied: Vec::new(),
            design_documents_saved: 0,
            documents_saved: 0,
            state: state.clone(),
        };

        let mut next = state.next_id();
        let end = self.registry.len();
        while next < end {
            let (designs, documents) = self.apply(next).await?;
            report.applied.push(next);
            report.design_documents_saved += designs;
            report.documents_saved += documents;
            next += 1;

            if self.policy == PersistPolicy::AfterEachChangeset && next < end {
                state.advance_to(next as i64 - 1);
                self.state_store.save(&state).await?;
            }
        }

        self.phase = EnginePhase::Persisting;
        state.advance_to(next as i64 - 1);
        self.state_store.save(&state).await?;

        report.state = state;
        Ok(report)
    }

    /// Rejoue la phase design des changesets déjà appliqués, sans aucune écriture.
    fn replay(&mut self, last_applied_id: i64) -> Result<u64> {
        if last_applied_id < 0 {
            return Ok(0);
        }
        let last = last_applied_id as ChangesetId;
        for id in 0..=last {
            let changeset = self.registry.require(id)?;
            let _span = info_span!("changeset", id, phase = "replay").entered();
            changeset.design(&mut DesignContext::new(id, &mut self.design_documents))?;
        }

        for document in self.design_documents.values_mut() {
            document.clean();
        }
        debug!(
            replayed = last + 1,
            design_documents = self.design_documents.len(),
            "Modèle d'index reconstruit"
        );
        Ok(last + 1)
    }

    /// Design, run puis validation d'un changeset. Rend (design documents, documents) écrits.
    async fn apply(&mut self, id: ChangesetId) -> Result<(usize, usize)> {
        let changeset = self.registry.require(id)?;
        match changeset.description() {
            Some(desc) => info!("Traitement du changeset #{} ({})", id, desc),
            None => info!("Traitement du changeset #{}", id),
        }

        self.phase = EnginePhase::Designing(id);
        {
            let _span = info_span!("changeset", id, phase = "design").entered();
            changeset.design(&mut DesignContext::new(id, &mut self.design_documents))?;
        }

        self.phase = EnginePhase::Running(id);
        let run_span = info_span!("changeset", id, phase = "run");
        let (tx, rx) = oneshot::channel();
        {
            let _guard = run_span.enter();
            changeset.run(RunContext::new(id, std::mem::take(&mut self.batch), tx));
        }

        self.batch = match rx.instrument(run_span).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(source)) => return Err(AppError::ChangesetSignaled { id, source }),
            Err(_) => return Err(AppError::ChangesetAbandoned(id)),
        };

        self.phase = EnginePhase::Committing(id);
        let commit_span = info_span!("changeset", id, phase = "commit");
        async {
            let designs = self.save_design(id).await?;
            let documents = self.save_documents(id).await?;
            Ok::<_, AppError>((designs, documents))
        }
        .instrument(commit_span)
        .await
    }

    /// Publie chaque design document modifié, puis le marque propre.
    async fn save_design(&mut self, id: ChangesetId) -> Result<usize> {
        let dirty: Vec<String> = self
            .design_documents
            .values()
            .filter(|doc| doc.is_dirty())
            .map(|doc| doc.name().to_string())
            .collect();

        if dirty.is_empty() {
            return Ok(0);
        }
        info!(
            "Enregistrement des modifications de design documents du changeset #{}...",
            id
        );

        for name in &dirty {
            let Some(document) = self.design_documents.get_mut(name) else {
                continue;
            };
            self.store
                .upsert_design_document(name, &document.to_json())
                .await
                .map_err(|source| AppError::IndexUpsert {
                    name: name.clone(),
                    source,
                })?;
            document.clean();
        }

        info!("{} design document(s) enregistré(s)", dirty.len());
        Ok(dirty.len())
    }

    /// Écrit le lot de documents en une vague. Le lot est vidé dans tous les cas.
    async fn save_documents(&mut self, id: ChangesetId) -> Result<usize> {
        let documents = self.batch.take();
        let count = documents.len();
        if count == 0 {
            return Ok(0);
        }
        info!("Enregistrement de {} document(s) pour le changeset #{}", count, id);

        let store = &self.store;
        stream::iter(documents)
            .map(|(doc_id, doc)| async move {
                let result = store.upsert(&doc_id, &doc).await;
                result.map_err(|source| AppError::DocumentUpsert { id: doc_id, source })
            })
            .buffer_unordered(FLUSH_CONCURRENCY)
            .try_collect::<Vec<()>>()
            .await?;

        info!("{} document(s) enregistré(s) pour le changeset #{}", count, id);
        Ok(count)
    }
}
