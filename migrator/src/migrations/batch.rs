// FICHIER : migrator/src/migrations/batch.rs

use crate::utils::json::{self, Value};
use crate::utils::{AppError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_ID_FIELD: &str = "id";

/// Charge utile d'un document : valeur en mémoire ou fichier JSON à charger.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentSource {
    Value(Value),
    File(PathBuf),
}

impl From<Value> for DocumentSource {
    fn from(value: Value) -> Self {
        DocumentSource::Value(value)
    }
}

impl From<PathBuf> for DocumentSource {
    fn from(path: PathBuf) -> Self {
        DocumentSource::File(path)
    }
}

impl From<&Path> for DocumentSource {
    fn from(path: &Path) -> Self {
        DocumentSource::File(path.to_path_buf())
    }
}

impl DocumentSource {
    /// Résout la charge utile ; seuls les objets JSON sont acceptés.
    pub fn resolve(self) -> Result<Value> {
        let (value, origin) = match self {
            DocumentSource::Value(v) => (v, None),
            DocumentSource::File(path) => (json::read_json_file::<Value>(&path)?, Some(path)),
        };
        if !value.is_object() {
            return Err(AppError::InvalidDocument(match origin {
                Some(path) => format!("{} ne contient pas un objet JSON", path.display()),
                None => "la charge utile doit être un objet JSON".to_string(),
            }));
        }
        Ok(value)
    }
}

/// Lot de documents accumulés par un changeset, écrits en une seule vague.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentBatch {
    documents: BTreeMap<String, Value>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute (ou remplace) un document sous l'identifiant donné.
    pub fn push(&mut self, id: impl Into<String>, source: impl Into<DocumentSource>) -> Result<()> {
        let value = source.into().resolve()?;
        self.documents.insert(id.into(), value);
        Ok(())
    }

    /// Ajoute un document dont l'identifiant est lu dans le champ `id_field`.
    pub fn push_with_id(
        &mut self,
        source: impl Into<DocumentSource>,
        id_field: &str,
    ) -> Result<String> {
        let value = source.into().resolve()?;
        let id = match value.get(id_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AppError::InvalidDocument(format!(
                    "champ d'identifiant '{}' absent ou invalide",
                    id_field
                )))
            }
        };
        self.documents.insert(id.clone(), value);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Vide le lot et rend son contenu.
    pub fn take(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut self.documents)
    }
}
