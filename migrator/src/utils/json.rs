// FICHIER : migrator/src/utils/json.rs

use crate::utils::{AppError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

// --- RE-EXPORTS (Single Source of Truth pour le JSON) ---
pub use serde_json::{json, Map, Value};

/// Parse une chaîne JSON en un type T.
/// Capture un extrait du contenu en cas d'échec.
pub fn parse<T: DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s).map_err(|e| {
        let snippet: String = s.chars().take(100).collect();
        tracing::debug!(snippet = %snippet, "JSON invalide");
        AppError::Serialization(e)
    })
}

/// Lit et parse un fichier JSON (lecture synchrone, fichiers de petite taille).
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("{} : {}", path.display(), e),
        ))
    })?;
    parse(&content)
}

/// Lit un fichier JSON de manière asynchrone.
pub async fn read_json_file_async<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("{} : {}", path.display(), e),
        ))
    })?;
    parse(&content)
}
