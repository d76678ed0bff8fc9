// FICHIER : migrator/src/utils/config.rs

use crate::utils::error::{AppError, Result};
use crate::utils::{env, json};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Constantes par défaut (Single Source of Truth)
pub const DEFAULT_CHANGESETS_DIR: &str = "./changesets";
pub const DEFAULT_STATE_KEY: &str = "_MigrationState";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 120;
pub const ENV_PREFIX: &str = "RAISE_MIGRATE_";

/// Moment où le curseur de migration est écrit en base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum PersistPolicy {
    /// Une seule écriture, après le dernier changeset.
    #[default]
    OnCompletion,
    /// Écriture après chaque changeset validé, puis à la fin.
    AfterEachChangeset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Dossier des logs JSON (fichier tournant quotidien). Console seule si absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Configuration complète d'une exécution de migration.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrateConfig {
    #[serde(default = "default_changesets_dir")]
    pub changesets_dir: PathBuf,

    /// Chaîne de connexion : `http(s)://…`, `file://…` ou `memory://`.
    #[serde(default)]
    pub server: String,

    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_state_key")]
    pub state_key: String,

    #[serde(default)]
    pub persist_policy: PersistPolicy,

    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    #[serde(default)]
    pub log: LogConfig,
}

// --- HELPERS SERDE ---

fn default_changesets_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CHANGESETS_DIR)
}
fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}
fn default_operation_timeout() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            changesets_dir: default_changesets_dir(),
            server: String::new(),
            bucket: String::new(),
            password: None,
            state_key: default_state_key(),
            persist_policy: PersistPolicy::default(),
            operation_timeout_secs: default_operation_timeout(),
            log: LogConfig::default(),
        }
    }
}

// Le mot de passe ne doit jamais apparaître dans les logs.
impl std::fmt::Debug for MigrateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrateConfig")
            .field("changesets_dir", &self.changesets_dir)
            .field("server", &self.server)
            .field("bucket", &self.bucket)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("state_key", &self.state_key)
            .field("persist_policy", &self.persist_policy)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .field("log", &self.log)
            .finish()
    }
}

impl MigrateConfig {
    /// Charge la configuration : défauts -> fichier JSON optionnel -> variables d'environnement.
    /// Les options du CLI sont appliquées ensuite par l'appelant.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => json::read_json_file::<MigrateConfig>(path).map_err(|e| {
                AppError::Config(format!("Fichier de configuration illisible : {}", e))
            })?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Surcharge par les variables `RAISE_MIGRATE_*`.
    pub fn apply_env(&mut self) -> Result<()> {
        let key = |name: &str| format!("{}{}", ENV_PREFIX, name);

        if let Some(dir) = env::get_optional(&key("CHANGESETS_DIR")) {
            self.changesets_dir = PathBuf::from(dir);
        }
        if let Some(server) = env::get_optional(&key("SERVER")) {
            self.server = server;
        }
        if let Some(bucket) = env::get_optional(&key("BUCKET")) {
            self.bucket = bucket;
        }
        if let Some(password) = env::get_optional(&key("PASSWORD")) {
            self.password = Some(password);
        }
        if let Some(state_key) = env::get_optional(&key("STATE_KEY")) {
            self.state_key = state_key;
        }
        if let Some(timeout) = env::get_parsed::<u64>(&key("TIMEOUT_SECS"))? {
            self.operation_timeout_secs = timeout;
        }
        if env::is_enabled(&key("CHECKPOINT_EACH")) {
            self.persist_policy = PersistPolicy::AfterEachChangeset;
        }
        if let Some(level) = env::get_optional(&key("LOG_LEVEL")) {
            self.log.level = level;
        }
        if let Some(dir) = env::get_optional(&key("LOG_DIR")) {
            self.log.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.trim().is_empty() {
            return Err(AppError::Config(
                "Chaîne de connexion manquante (ex: http://127.0.0.1:5984)".to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(AppError::Config("Nom de bucket manquant".to_string()));
        }
        if self.state_key.trim().is_empty() {
            return Err(AppError::Config(
                "La clé du document d'état ne peut pas être vide".to_string(),
            ));
        }
        if self.operation_timeout_secs == 0 {
            return Err(AppError::Config(
                "Le timeout des opérations doit être strictement positif".to_string(),
            ));
        }
        Ok(())
    }
}
