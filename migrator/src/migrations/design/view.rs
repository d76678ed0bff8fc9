// FICHIER : migrator/src/migrations/design/view.rs

use serde::Serialize;
use serde_json::Value;

/// Une vue (index secondaire) : couple de sources map/reduce.
///
/// Toute affectation d'une source, même à `None`, rend la vue « sale ».
/// Seul `clean()` remet le drapeau à zéro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    #[serde(skip)]
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reduce: Option<String>,
    #[serde(skip)]
    dirty: bool,
}

// Une source vide équivaut à une source absente.
fn normalize(source: Option<String>) -> Option<String> {
    source.filter(|s| !s.is_empty())
}

impl View {
    /// Nouvelle vue, sans source, marquée sale.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map: None,
            reduce: None,
            dirty: true,
        }
    }

    pub fn with_map(mut self, source: impl Into<String>) -> Self {
        self.set_map(Some(source.into()));
        self
    }

    pub fn with_reduce(mut self, source: impl Into<String>) -> Self {
        self.set_reduce(Some(source.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn reduce(&self) -> Option<&str> {
        self.reduce.as_deref()
    }

    pub fn set_map(&mut self, source: Option<String>) {
        self.map = normalize(source);
        self.dirty = true;
    }

    pub fn set_reduce(&mut self, source: Option<String>) {
        self.reduce = normalize(source);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clean(&mut self) {
        self.dirty = false;
    }

    /// Forme publiée : `{"map": ..., "reduce": ...}`, champs absents omis.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(map) = &self.map {
            obj.insert("map".to_string(), Value::String(map.clone()));
        }
        if let Some(reduce) = &self.reduce {
            obj.insert("reduce".to_string(), Value::String(reduce.clone()));
        }
        Value::Object(obj)
    }
}
