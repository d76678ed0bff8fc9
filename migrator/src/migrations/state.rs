// FICHIER : migrator/src/migrations/state.rs

use crate::store::{DocumentStore, StoreError};
use crate::utils::prelude::*;
use std::sync::Arc;

pub const STATE_FORMAT_VERSION: &str = "1.0";

/// Curseur persistant : dernier changeset validé (-1 = aucun).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(alias = "lastId")]
    pub last_applied_id: i64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_version() -> String {
    STATE_FORMAT_VERSION.to_string()
}

impl Default for MigrationState {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_applied_id: -1,
            last_updated: None,
        }
    }
}

impl MigrationState {
    /// Premier identifiant restant à exécuter.
    pub fn next_id(&self) -> u64 {
        (self.last_applied_id + 1).max(0) as u64
    }

    /// Avance le curseur et horodate.
    pub fn advance_to(&mut self, last_applied_id: i64) {
        self.last_applied_id = last_applied_id;
        self.last_updated = Some(Utc::now());
    }
}

/// Lecture/écriture du curseur dans le store, sous une clé réservée.
#[derive(Clone)]
pub struct StateStore {
    store: Arc<dyn DocumentStore>,
    key: String,
}

impl StateStore {
    pub fn new(store: Arc<dyn DocumentStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Un document absent signifie une première exécution.
    pub async fn load(&self) -> Result<MigrationState> {
        match self.store.get(&self.key).await {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| AppError::StoreFetch(StoreError::Serialization(e))),
            Err(e) if e.is_not_found() => {
                info!("Aucun état de migration '{}' : première exécution", self.key);
                Ok(MigrationState::default())
            }
            Err(e) => Err(AppError::StoreFetch(e)),
        }
    }

    pub async fn save(&self, state: &MigrationState) -> Result<()> {
        let value = serde_json::to_value(state)?;
        self.store
            .upsert(&self.key, &value)
            .await
            .map_err(AppError::CursorPersist)?;
        debug!(last_applied_id = state.last_applied_id, "État de migration enregistré");
        Ok(())
    }
}
