// FICHIER : migrator/src/migrations/design/document.rs

use super::view::View;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Design document : collection nommée de vues, avec suivi des modifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignDocument {
    name: String,
    views: BTreeMap<String, View>,
    self_dirty: bool,
}

impl DesignDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            views: BTreeMap::new(),
            self_dirty: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insère ou remplace une vue (par nom).
    pub fn push_view(&mut self, view: View) {
        self.views.insert(view.name().to_string(), view);
        self.self_dirty = true;
    }

    /// Retire une vue. Le document est marqué sale même si la vue n'existait pas.
    pub fn remove_view(&mut self, name: &str) -> Option<View> {
        self.self_dirty = true;
        self.views.remove(name)
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// Accès mutable : modifier les sources salit la vue, donc le document.
    pub fn view_mut(&mut self, name: &str) -> Option<&mut View> {
        self.views.get_mut(name)
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.self_dirty || self.views.values().any(View::is_dirty)
    }

    /// Nettoie récursivement les vues puis le document.
    pub fn clean(&mut self) {
        for view in self.views.values_mut() {
            view.clean();
        }
        self.self_dirty = false;
    }

    /// Définition publiée : `{"views": {nom: vue, ...}}`.
    pub fn to_json(&self) -> Value {
        let views: Map<String, Value> = self
            .views
            .iter()
            .map(|(name, view)| (name.clone(), view.to_json()))
            .collect();
        json!({ "views": views })
    }
}

impl Serialize for DesignDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("views", &self.views)?;
        map.end()
    }
}
