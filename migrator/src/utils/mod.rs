// FICHIER : migrator/src/utils/mod.rs

// =========================================================================
//  RAISE MIGRATE UTILS - Foundation Layer
// =========================================================================

pub mod config;
pub mod env;
pub mod error;
pub mod json;
pub mod logger;

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::config::{MigrateConfig, PersistPolicy};
    pub use super::error::{AppError, Result};
    pub use super::json::{json, Value};
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, instrument, warn};
}

// --> Config & Erreurs
pub use config::MigrateConfig;
pub use error::{AppError, Result};
pub use logger::init_logging;
