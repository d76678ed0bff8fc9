// FICHIER : migrator/src/store/couch.rs

use super::{DocumentStore, StoreError, StoreResult};
use crate::utils::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DESIGN_PREFIX: &str = "_design";

/// Store HTTP compatible CouchDB (documents et design documents/vues).
///
/// L'upsert lit la révision courante (`_rev`) puis remplace le document.
#[derive(Debug, Clone)]
pub struct CouchStore {
    client: Client,
    base: Url,
    bucket: String,
    password: Option<String>,
}

impl CouchStore {
    pub fn new(
        server: &str,
        bucket: &str,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let base = Url::parse(server)
            .map_err(|e| AppError::Config(format!("URL serveur invalide '{}' : {}", server, e)))?;
        if base.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "URL serveur inutilisable comme base : '{}'",
                server
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Raise-Migrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Client HTTP impossible à créer : {}", e)))?;

        Ok(Self {
            client,
            base,
            bucket: bucket.to_string(),
            password: password.map(str::to_string),
        })
    }

    /// URL d'un document : `<base>/<bucket>/<segments...>`, chaque segment encodé.
    pub fn document_url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StoreError::Backend(format!("URL de base invalide : {}", self.base)))?;
            path.pop_if_empty().push(&self.bucket);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.password {
            Some(password) => request.basic_auth(&self.bucket, Some(password)),
            None => request,
        }
    }

    async fn fetch(&self, url: Url, key: &str) -> StoreResult<Value> {
        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }

    async fn put(&self, segments: &[&str], key: &str, value: &Value) -> StoreResult<()> {
        let url = self.document_url(segments)?;

        let current_rev = match self.fetch(url.clone(), key).await {
            Ok(existing) => existing
                .get("_rev")
                .and_then(|r| r.as_str())
                .map(str::to_string),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let body = with_revision(value, current_rev.as_deref())?;
        debug!(key, rev = ?current_rev, "PUT document");

        let response = self.authorize(self.client.put(url).json(&body)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Injecte (ou retire) `_rev` dans le corps à envoyer.
fn with_revision(value: &Value, rev: Option<&str>) -> StoreResult<Value> {
    let Some(obj) = value.as_object() else {
        return Err(StoreError::Backend(
            "Seuls les objets JSON peuvent être stockés".to_string(),
        ));
    };
    let mut obj = obj.clone();
    obj.remove("_rev");
    if let Some(rev) = rev {
        obj.insert("_rev".to_string(), Value::String(rev.to_string()));
    }
    Ok(Value::Object(obj))
}

#[async_trait]
impl DocumentStore for CouchStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> StoreResult<Value> {
        let url = self.document_url(&[key])?;
        self.fetch(url, key).await
    }

    #[instrument(skip(self, value), fields(bucket = %self.bucket))]
    async fn upsert(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.put(&[key], key, value).await
    }

    #[instrument(skip(self, definition), fields(bucket = %self.bucket))]
    async fn upsert_design_document(&self, name: &str, definition: &Value) -> StoreResult<()> {
        let key = format!("{}/{}", DESIGN_PREFIX, name);
        self.put(&[DESIGN_PREFIX, name], &key, definition).await
    }
}
