// FICHIER : migrator/src/migrations/loader.rs

//! Changesets déclaratifs chargés depuis un dossier de fichiers JSON.
//!
//! ```json
//! {
//!   "id": 0,
//!   "description": "Vues initiales",
//!   "design": [
//!     { "op": "pushView", "designDocument": "users", "view": "by_email",
//!       "map": "function (doc, meta) { emit(doc.email, null); }" }
//!   ],
//!   "run": [
//!     { "op": "pushDocument", "id": "settings", "document": { "theme": "dark" } },
//!     { "op": "pushDocumentWithId", "file": "seed/admin.json" }
//!   ]
//! }
//! ```

use super::batch::DEFAULT_ID_FIELD;
use super::changeset::Changeset;
use super::context::{DesignContext, RunContext};
use super::design::{DesignDocument, View};
use super::registry::{ChangesetCandidate, ChangesetRegistry};
use crate::utils::json::{self, read_json_file_async};
use crate::utils::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Étape de la phase design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DesignStep {
    #[serde(rename_all = "camelCase")]
    CreateDesignDocument { design_document: String },
    #[serde(rename_all = "camelCase")]
    PushView {
        design_document: String,
        view: String,
        #[serde(default)]
        map: Option<String>,
        #[serde(default)]
        reduce: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RemoveView {
        design_document: String,
        view: String,
    },
}

/// Étape de la phase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RunStep {
    #[serde(rename_all = "camelCase")]
    PushDocument {
        id: String,
        #[serde(default)]
        document: Option<Value>,
        #[serde(default)]
        file: Option<PathBuf>,
    },
    #[serde(rename_all = "camelCase")]
    PushDocumentWithId {
        #[serde(default)]
        document: Option<Value>,
        #[serde(default)]
        file: Option<PathBuf>,
        #[serde(default = "default_id_field")]
        id_field: String,
    },
    Log { message: String },
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

/// Contenu brut d'un fichier de changeset.
#[derive(Debug, Deserialize)]
struct ChangesetFile {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    design: Vec<DesignStep>,
    #[serde(default)]
    run: Option<Vec<RunStep>>,
}

/// Changeset déclaratif. Les chemins de fichiers sont relatifs au fichier du changeset.
#[derive(Debug, Clone)]
pub struct FileChangeset {
    base_dir: PathBuf,
    description: Option<String>,
    design: Vec<DesignStep>,
    run: Vec<RunStep>,
}

impl FileChangeset {
    pub fn new(base_dir: impl Into<PathBuf>, design: Vec<DesignStep>, run: Vec<RunStep>) -> Self {
        Self {
            base_dir: base_dir.into(),
            description: None,
            design,
            run,
        }
    }
}

/// Charge une charge utile déclarée inline ou par fichier.
async fn load_payload(
    base_dir: &Path,
    document: Option<Value>,
    file: Option<PathBuf>,
) -> Result<Value> {
    match (document, file) {
        (Some(doc), None) => Ok(doc),
        (None, Some(file)) => read_json_file_async(&base_dir.join(file)).await,
        _ => Err(AppError::InvalidDocument(
            "exactement un de 'document' ou 'file' doit être fourni".to_string(),
        )),
    }
}

async fn execute_run_steps(base_dir: &Path, steps: Vec<RunStep>, ctx: &mut RunContext) -> Result<()> {
    for step in steps {
        match step {
            RunStep::PushDocument { id, document, file } => {
                let payload = load_payload(base_dir, document, file).await?;
                ctx.push_document(id, payload)?;
            }
            RunStep::PushDocumentWithId {
                document,
                file,
                id_field,
            } => {
                let payload = load_payload(base_dir, document, file).await?;
                let id = ctx.push_document_with_id(payload, &id_field)?;
                debug!(changeset = ctx.changeset_id(), id = %id, "Document ajouté au lot");
            }
            RunStep::Log { message } => {
                info!(changeset = ctx.changeset_id(), "{}", message);
            }
        }
    }
    Ok(())
}

impl Changeset for FileChangeset {
    fn design(&self, ctx: &mut DesignContext<'_>) -> Result<()> {
        for step in &self.design {
            match step {
                DesignStep::CreateDesignDocument { design_document } => {
                    ctx.push_design_document(DesignDocument::new(design_document));
                }
                DesignStep::PushView {
                    design_document,
                    view,
                    map,
                    reduce,
                } => {
                    let mut v = View::new(view);
                    v.set_map(map.clone());
                    v.set_reduce(reduce.clone());
                    ctx.push_view(design_document, v);
                }
                DesignStep::RemoveView {
                    design_document,
                    view,
                } => {
                    ctx.remove_view(design_document, view);
                }
            }
        }
        Ok(())
    }

    fn run(&self, mut ctx: RunContext) {
        let base_dir = self.base_dir.clone();
        let steps = self.run.clone();

        // Lectures de fichiers asynchrones : la fin est signalée depuis la tâche.
        tokio::spawn(async move {
            match execute_run_steps(&base_dir, steps, &mut ctx).await {
                Ok(()) => ctx.done(),
                Err(e) => ctx.error(e),
            }
        });
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Parse un fichier de changeset en candidat (non validé).
pub fn load_changeset_file(path: &Path) -> Result<ChangesetCandidate> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let raw: ChangesetFile = json::read_json_file(path)
        .map_err(|e| AppError::Registry(format!("changeset illisible {} : {}", source, e)))?;

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let changeset = raw.run.map(|run| {
        Arc::new(FileChangeset {
            base_dir,
            description: raw.description,
            design: raw.design,
            run,
        }) as Arc<dyn Changeset>
    });

    Ok(ChangesetCandidate {
        source,
        declared_id: raw.id,
        changeset,
    })
}

/// Liste les fichiers `*.json` du dossier (un seul niveau), triés par nom.
pub fn load_changeset_dir(dir: &Path) -> Result<Vec<ChangesetCandidate>> {
    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Dossier de changesets introuvable : {}",
            dir.display()
        )));
    }

    info!("Chargement des changesets depuis {:?}...", dir);

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| AppError::Io(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path.to_path_buf());
        }
    }
    files.sort();

    info!("{} fichier(s) trouvé(s).", files.len());
    files.iter().map(|p| load_changeset_file(p)).collect()
}

impl ChangesetRegistry {
    /// Charge et valide tous les changesets d'un dossier.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_candidates(load_changeset_dir(dir)?)
    }
}
