// FICHIER : migrator/src/store/file.rs

use super::{DocumentStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Store documentaire local : un fichier JSON par document.
///
/// Arborescence : `<root>/<bucket>/docs/<id>.json` et
/// `<root>/<bucket>/_design/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    bucket_root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            bucket_root: root.as_ref().join(encode_key(bucket)),
        }
    }

    pub fn document_path(&self, key: &str) -> PathBuf {
        self.bucket_root
            .join("docs")
            .join(format!("{}.json", encode_key(key)))
    }

    pub fn design_document_path(&self, name: &str) -> PathBuf {
        self.bucket_root
            .join("_design")
            .join(format!("{}.json", encode_key(name)))
    }
}

/// Les clés peuvent contenir des séparateurs de chemin : on les encode.
fn encode_key(key: &str) -> String {
    url::form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

/// Écriture atomique sécurisée (write -> sync -> rename)
pub async fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> StoreResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
    }

    fs::rename(&temp_path, path).await?;
    Ok(())
}

async fn write_json(path: &Path, value: &Value) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    atomic_write(path, content.as_bytes()).await
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let path = self.document_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    async fn upsert(&self, key: &str, value: &Value) -> StoreResult<()> {
        write_json(&self.document_path(key), value).await
    }

    async fn upsert_design_document(&self, name: &str, definition: &Value) -> StoreResult<()> {
        write_json(&self.design_document_path(name), definition).await
    }
}
