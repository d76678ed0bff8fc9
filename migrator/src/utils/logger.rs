// FICHIER : migrator/src/utils/logger.rs

use crate::utils::config::LogConfig;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Sécurité pour éviter la double initialisation (crash fréquent en tests)
static INIT: Once = Once::new();

/// Construit le filtre console : `RUST_LOG` prioritaire, sinon le niveau configuré.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_logging(config: &LogConfig) {
    INIT.call_once(|| {
        // =========================================================================
        // LAYER 1 : CONSOLE (Pour l'Humain)
        // =========================================================================
        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(build_filter(&config.level));

        // =========================================================================
        // LAYER 2 : FICHIER JSON (Optionnel, rotation quotidienne)
        // =========================================================================
        let file_layer = config.log_dir_ready().map(|dir| {
            let file_appender = rolling::daily(dir, "raise-migrate.log");
            fmt::layer()
                .json()
                .with_writer(file_appender)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        let registry = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Ré-initialisation ignorée (subscriber global déjà actif).");
            return;
        }

        match &config.dir {
            Some(dir) => tracing::info!("🚀 Logger initialisé. Logs disponibles dans : {:?}", dir),
            None => tracing::debug!("Logger initialisé (console uniquement)"),
        }
    });
}

impl LogConfig {
    /// Crée le dossier de logs si nécessaire ; `None` si absent ou inutilisable.
    fn log_dir_ready(&self) -> Option<&std::path::Path> {
        let dir = self.dir.as_deref()?;
        match std::fs::create_dir_all(dir) {
            Ok(()) => Some(dir),
            Err(e) => {
                eprintln!("⚠️ Dossier de logs inutilisable {:?} : {}", dir, e);
                None
            }
        }
    }
}
