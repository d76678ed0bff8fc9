// FICHIER : migrator/tools/migrate-cli/src/main.rs

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use raise_migrate::utils::config::{MigrateConfig, PersistPolicy};
use raise_migrate::utils::init_logging;

#[derive(Parser, Debug)]
#[command(
    name = "raise-migrate",
    version,
    about = "Applique les changesets en attente sur une base documentaire"
)]
struct Cli {
    /// Dossier contenant les fichiers de changesets (*.json)
    #[arg(short = 'c', long = "changesets-folder")]
    changesets_folder: Option<PathBuf>,

    /// Chaîne de connexion (http(s)://hôte:port, file:///chemin ou memory://)
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Nom du bucket (base) cible
    #[arg(short = 'b', long)]
    bucket: Option<String>,

    /// Mot de passe du bucket
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Fichier de configuration JSON (surchargé par l'environnement puis par les options)
    #[arg(long, env = "RAISE_MIGRATE_CONFIG")]
    config: Option<PathBuf>,

    /// Clé du document d'état de migration
    #[arg(long)]
    state_key: Option<String>,

    /// Écrit le curseur après chaque changeset validé
    #[arg(long)]
    checkpoint_each: bool,

    /// Affiche le bilan au format JSON sur la sortie standard
    #[arg(long)]
    json: bool,

    /// Verbosité (-v : debug, -vv : trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Les options explicites l'emportent sur le fichier et l'environnement.
    fn apply_to(&self, config: &mut MigrateConfig) {
        if let Some(dir) = &self.changesets_folder {
            config.changesets_dir = dir.clone();
        }
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(state_key) = &self.state_key {
            config.state_key = state_key.clone();
        }
        if self.checkpoint_each {
            config.persist_policy = PersistPolicy::AfterEachChangeset;
        }
        match self.verbose {
            0 => {}
            1 => config.log.level = "debug".to_string(),
            _ => config.log.level = "trace".to_string(),
        }
    }
}

fn build_config(cli: &Cli) -> Result<MigrateConfig> {
    let mut config =
        MigrateConfig::load(cli.config.as_deref()).context("Chargement de la configuration")?;
    cli.apply_to(&mut config);
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.log);

    match raise_migrate::run_from_config(&config).await {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => tracing::warn!("Bilan non sérialisable : {}", e),
                }
            } else {
                println!(
                    "✅ {} changeset(s) appliqué(s), {} rejoué(s). Curseur : {}",
                    report.applied.len(),
                    report.replayed,
                    report.state.last_applied_id
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Migration échouée : {}", e);
            eprintln!("❌ Migration échouée : {}", e);
            ExitCode::FAILURE
        }
    }
}
