// FICHIER : migrator/src/utils/error.rs

use crate::store::StoreError;
use serde::Serialize;
use std::io;

/// Type de résultat standard du moteur de migration.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs du moteur.
/// Chaque variante fatale correspond à un point d'arrêt de l'exécution.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),

    /// Lecture du curseur impossible (hors cas « document absent »).
    #[error("Lecture de l'état de migration impossible : {0}")]
    StoreFetch(#[source] StoreError),

    #[error("Registre de changesets invalide : {0}")]
    Registry(String),

    /// Trou dans le registre à une position nécessaire au rejeu ou à l'exécution.
    #[error("Changeset #{0} introuvable dans le registre")]
    MissingChangeset(u64),

    #[error("Échec de l'enregistrement du design document '{name}' : {source}")]
    IndexUpsert {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Échec de l'enregistrement du document '{id}' : {source}")]
    DocumentUpsert {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Le changeset #{id} a signalé une erreur : {source}")]
    ChangesetSignaled {
        id: u64,
        #[source]
        source: anyhow::Error,
    },

    #[error("Le changeset #{0} s'est terminé sans appeler done() ni error()")]
    ChangesetAbandoned(u64),

    #[error("Document invalide : {0}")]
    InvalidDocument(String),

    #[error("Échec de l'écriture de l'état de migration : {0}")]
    CursorPersist(#[source] StoreError),
}

// Les erreurs remontent au CLI sous forme de chaîne simple.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
