// FICHIER : migrator/src/migrations/changeset.rs

use super::context::{DesignContext, RunContext};
use crate::utils::Result;

/// Identifiant séquentiel d'un changeset (index dense dans le registre).
pub type ChangesetId = u64;

/// Unité de migration versionnée.
///
/// `design` ne fait que modifier le modèle d'index : il est rejoué à chaque
/// exécution pour reconstruire l'état cumulé, sans aucune écriture.
/// `run` porte les effets de bord et doit terminer par `ctx.done()` ou
/// `ctx.error(..)`, éventuellement depuis une tâche asynchrone.
pub trait Changeset: Send + Sync {
    fn design(&self, _ctx: &mut DesignContext<'_>) -> Result<()> {
        Ok(())
    }

    fn run(&self, ctx: RunContext);

    fn description(&self) -> Option<&str> {
        None
    }
}
