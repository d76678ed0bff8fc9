// FICHIER : migrator/src/migrations/registry.rs

use super::changeset::{Changeset, ChangesetId};
use crate::utils::prelude::*;
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Les identifiants servent d'index dense : une valeur aberrante (date, horodatage)
/// allouerait un registre gigantesque.
pub const MAX_CHANGESET_ID: ChangesetId = 1_000_000;

/// Candidat issu d'une source externe (fichier, code), avant validation.
pub struct ChangesetCandidate {
    /// Origine du candidat, pour les logs (ex: nom de fichier).
    pub source: String,
    /// Identifiant déclaré, tel quel (nombre ou chaîne).
    pub declared_id: Value,
    /// `None` si le candidat ne fournit pas de phase run.
    pub changeset: Option<Arc<dyn Changeset>>,
}

/// Séquence dense de changesets, indexée par identifiant.
#[derive(Clone, Default)]
pub struct ChangesetRegistry {
    slots: Vec<Option<Arc<dyn Changeset>>>,
}

fn leading_integer() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([+-]?)(\d+)").expect("regex statique valide"))
}

/// Interprète un identifiant déclaré comme un entier décimal (préfixe numérique accepté).
/// `None` si l'identifiant n'est pas un entier positif ou nul.
pub fn parse_declared_id(raw: &Value) -> Option<ChangesetId> {
    match raw {
        Value::Number(n) => {
            if let Some(id) = n.as_u64() {
                return Some(id);
            }
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f.trunc() as u64)
        }
        Value::String(s) => {
            let caps = leading_integer().captures(s)?;
            if &caps[1] == "-" {
                // "-0" reste valide, comme un entier nul.
                return caps[2].parse::<u64>().ok().filter(|id| *id == 0);
            }
            caps[2].parse::<u64>().ok()
        }
        _ => None,
    }
}

impl ChangesetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place un changeset dans son emplacement ; un identifiant déjà pris est une erreur.
    pub fn register(&mut self, id: ChangesetId, changeset: Arc<dyn Changeset>) -> Result<()> {
        if id > MAX_CHANGESET_ID {
            return Err(AppError::Registry(format!(
                "identifiant hors limites : {} (maximum {})",
                id, MAX_CHANGESET_ID
            )));
        }
        let index = id as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].is_some() {
            return Err(AppError::Registry(format!(
                "identifiant de changeset dupliqué : {}",
                id
            )));
        }
        self.slots[index] = Some(changeset);
        Ok(())
    }

    /// Valide puis enregistre un candidat. `Ok(false)` s'il est ignoré.
    pub fn register_candidate(&mut self, candidate: ChangesetCandidate) -> Result<bool> {
        let Some(id) = parse_declared_id(&candidate.declared_id) else {
            warn!(
                source = %candidate.source,
                declared_id = %candidate.declared_id,
                "Changeset ignoré : identifiant invalide"
            );
            return Ok(false);
        };
        let Some(changeset) = candidate.changeset else {
            warn!(source = %candidate.source, id, "Changeset ignoré : aucune phase run");
            return Ok(false);
        };
        self.register(id, changeset).map_err(|e| match e {
            AppError::Registry(msg) => AppError::Registry(format!("{} ({})", msg, candidate.source)),
            other => other,
        })?;
        debug!(source = %candidate.source, id, "Changeset enregistré");
        Ok(true)
    }

    pub fn from_candidates(candidates: Vec<ChangesetCandidate>) -> Result<Self> {
        let mut registry = Self::new();
        for candidate in candidates {
            registry.register_candidate(candidate)?;
        }
        let holes = registry.missing_ids();
        if !holes.is_empty() {
            warn!(?holes, "Registre de changesets incomplet");
        }
        Ok(registry)
    }

    pub fn get(&self, id: ChangesetId) -> Option<&Arc<dyn Changeset>> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.slots.get(i))
            .and_then(Option::as_ref)
    }

    /// Comme `get`, mais un emplacement vide est une erreur fatale.
    pub fn require(&self, id: ChangesetId) -> Result<Arc<dyn Changeset>> {
        self.get(id)
            .cloned()
            .ok_or(AppError::MissingChangeset(id))
    }

    /// Un de plus que le plus grand identifiant enregistré.
    pub fn len(&self) -> u64 {
        self.slots.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<ChangesetId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i as ChangesetId)
            .collect()
    }

    /// Emplacements vides sous le plus grand identifiant.
    pub fn missing_ids(&self) -> Vec<ChangesetId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i as ChangesetId)
            .collect()
    }
}
