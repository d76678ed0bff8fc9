// FICHIER : migrator/src/migrations/mod.rs

//! Système de migrations par changesets.
//!
//! Chaque changeset est appliqué une seule fois, dans l'ordre de son
//! identifiant. Le curseur de progression est stocké dans la base elle-même ;
//! le modèle d'index est reconstruit à chaque exécution en rejouant la phase
//! design de l'historique, et seules les définitions modifiées sont publiées.

pub mod batch;
pub mod changeset;
pub mod context;
pub mod design;
pub mod engine;
pub mod loader;
pub mod registry;
pub mod state;

pub use batch::{DocumentBatch, DocumentSource};
pub use changeset::{Changeset, ChangesetId};
pub use context::{DesignContext, RunContext};
pub use design::{DesignDocument, View};
pub use engine::{EnginePhase, MigrationEngine, MigrationReport};
pub use loader::{DesignStep, FileChangeset, RunStep};
pub use registry::{ChangesetCandidate, ChangesetRegistry};
pub use state::{MigrationState, StateStore};
