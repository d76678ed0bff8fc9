// FICHIER : migrator/src/store/mod.rs

//! Frontière avec la base documentaire.
//!
//! Le moteur n'utilise que trois capacités : lire un document, écrire
//! (upsert) un document, et publier la définition d'un design document.
//! Tout le reste (connexion, authentification, protocole) appartient au
//! backend choisi.

pub mod couch;
pub mod file;
pub mod memory;

use crate::utils::config::MigrateConfig;
use crate::utils::{AppError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use couch::CouchStore;
pub use file::FileStore;
pub use memory::{MemoryStore, StoreOp};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document introuvable : {0}")]
    NotFound(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON invalide : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Réseau : {0}")]
    Http(#[from] reqwest::Error),

    #[error("Le serveur a répondu {status} : {body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Capacités consommées par le moteur de migration.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lit un document. `StoreError::NotFound` si la clé est absente.
    async fn get(&self, key: &str) -> StoreResult<Value>;

    async fn upsert(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Publie (crée ou remplace) la définition d'un design document.
    async fn upsert_design_document(&self, name: &str, definition: &Value) -> StoreResult<()>;
}

/// Ouvre le backend correspondant au schéma de la chaîne de connexion.
pub fn open_store(config: &MigrateConfig) -> Result<Arc<dyn DocumentStore>> {
    let server = config.server.trim();

    if server.starts_with("memory://") {
        return Ok(Arc::new(MemoryStore::new()));
    }

    if let Some(root) = server.strip_prefix("file://") {
        return Ok(Arc::new(FileStore::new(root, &config.bucket)));
    }

    if server.starts_with("http://") || server.starts_with("https://") {
        let store = CouchStore::new(
            server,
            &config.bucket,
            config.password.as_deref(),
            std::time::Duration::from_secs(config.operation_timeout_secs),
        )?;
        return Ok(Arc::new(store));
    }

    Err(AppError::Config(format!(
        "Schéma de connexion non supporté : '{}' (attendu http(s)://, file:// ou memory://)",
        server
    )))
}
