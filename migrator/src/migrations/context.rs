// FICHIER : migrator/src/migrations/context.rs

//! Capacités exposées aux changesets.
//!
//! Le moteur reste l'unique propriétaire du modèle d'index et du lot de
//! documents : un changeset n'y accède qu'à travers ces contextes.

use super::batch::{DocumentBatch, DocumentSource};
use super::changeset::ChangesetId;
use super::design::{DesignDocument, View};
use crate::utils::Result;
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// Contexte de la phase design : mutation du modèle d'index uniquement.
pub struct DesignContext<'a> {
    id: ChangesetId,
    documents: &'a mut BTreeMap<String, DesignDocument>,
}

impl<'a> DesignContext<'a> {
    pub(crate) fn new(id: ChangesetId, documents: &'a mut BTreeMap<String, DesignDocument>) -> Self {
        Self { id, documents }
    }

    pub fn changeset_id(&self) -> ChangesetId {
        self.id
    }

    /// Enregistre un design document ; remplace celui de même nom.
    pub fn push_design_document(&mut self, document: DesignDocument) {
        self.documents
            .insert(document.name().to_string(), document);
    }

    pub fn design_document(&self, name: &str) -> Option<&DesignDocument> {
        self.documents.get(name)
    }

    pub fn design_document_mut(&mut self, name: &str) -> Option<&mut DesignDocument> {
        self.documents.get_mut(name)
    }

    /// Retourne le design document, créé vide s'il n'existe pas encore.
    pub fn ensure_design_document(&mut self, name: &str) -> &mut DesignDocument {
        self.documents
            .entry(name.to_string())
            .or_insert_with(|| DesignDocument::new(name))
    }

    pub fn push_view(&mut self, design_document: &str, view: View) {
        self.ensure_design_document(design_document).push_view(view);
    }

    /// Retire une vue ; sans effet si le design document n'existe pas.
    pub fn remove_view(&mut self, design_document: &str, view: &str) -> Option<View> {
        self.documents
            .get_mut(design_document)
            .and_then(|doc| doc.remove_view(view))
    }
}

/// Issue signalée par un changeset : le lot accumulé, ou l'erreur qui interrompt tout.
pub(crate) type Completion = std::result::Result<DocumentBatch, anyhow::Error>;

/// Contexte de la phase run.
///
/// `done()` et `error()` consomment le contexte : le signal de fin est émis
/// au plus une fois. Abandonner le contexte sans l'un ni l'autre est détecté
/// par le moteur.
pub struct RunContext {
    id: ChangesetId,
    batch: DocumentBatch,
    completion: oneshot::Sender<Completion>,
}

impl RunContext {
    pub(crate) fn new(
        id: ChangesetId,
        batch: DocumentBatch,
        completion: oneshot::Sender<Completion>,
    ) -> Self {
        Self {
            id,
            batch,
            completion,
        }
    }

    pub fn changeset_id(&self) -> ChangesetId {
        self.id
    }

    pub fn push_document(
        &mut self,
        id: impl Into<String>,
        source: impl Into<DocumentSource>,
    ) -> Result<()> {
        self.batch.push(id, source)
    }

    pub fn push_document_with_id(
        &mut self,
        source: impl Into<DocumentSource>,
        id_field: &str,
    ) -> Result<String> {
        self.batch.push_with_id(source, id_field)
    }

    pub fn pending_documents(&self) -> usize {
        self.batch.len()
    }

    /// Fin normale : le moteur passe à la validation.
    pub fn done(self) {
        // Récepteur disparu : le moteur a déjà abandonné l'exécution.
        let _ = self.completion.send(Ok(self.batch));
    }

    /// Interrompt toute l'exécution avec cette erreur.
    pub fn error(self, err: impl Into<anyhow::Error>) {
        let _ = self.completion.send(Err(err.into()));
    }
}
