// FICHIER : migrator/src/lib.rs

pub mod migrations;
pub mod store;
pub mod utils;

use migrations::{ChangesetRegistry, MigrationEngine, MigrationReport};
use utils::prelude::*;

/// Exécution complète à partir d'une configuration : store, registre, moteur.
pub async fn run_from_config(config: &MigrateConfig) -> Result<MigrationReport> {
    config.validate()?;
    info!(config = ?config, "Démarrage de la migration");

    let store = store::open_store(config)?;
    let registry = ChangesetRegistry::from_dir(&config.changesets_dir)?;

    let mut engine = MigrationEngine::from_config(config, store, registry);
    engine.run().await
}
