//! Document store collaborator and its Elasticsearch implementation.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use vehicle_telem::{document::INDEX_FIELDS, VehicleDocument};

use crate::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether [`DocumentStore::ensure_index`] found the collection or had to create it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Existing,
    Created,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the collection with its field mapping unless it already exists. Idempotent.
    async fn ensure_index(&self) -> Result<IndexState, StoreError>;

    async fn index(&self, doc: &VehicleDocument) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    pub index: String,
    /// Basic auth credentials, used only when both parts are present.
    pub auth: Option<(String, String)>,
    /// PEM root certificate to trust in addition to the built-in roots.
    pub ca_cert: Option<PathBuf>,
}

/// Mapping body sent when creating the index.
pub fn index_mapping() -> Value {
    let properties: Map<String, Value> = INDEX_FIELDS
        .iter()
        .map(|(field, ty)| (field.to_string(), json!({ "type": ty })))
        .collect();
    json!({ "mappings": { "properties": properties } })
}

pub struct ElasticsearchStore {
    client: Client,
    host: String,
    index: String,
    auth: Option<(String, String)>,
}

impl ElasticsearchStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|source| StoreError::CaCert {
                path: path.display().to_string(),
                source,
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }
        Ok(Self {
            client: builder.build()?,
            host: config.host.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            auth: config.auth.clone(),
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn request(&self, method: Method, suffix: &str) -> RequestBuilder {
        let url = format!("{}/{}{}", self.host, self.index, suffix);
        let request = self.client.request(method, url);
        match &self.auth {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }
}

async fn status_error(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Status { status, body }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn ensure_index(&self) -> Result<IndexState, StoreError> {
        let response = self.request(Method::HEAD, "").send().await?;
        match response.status() {
            StatusCode::OK => {
                info!(index = %self.index, "index already exists");
                return Ok(IndexState::Existing);
            }
            StatusCode::NOT_FOUND => {}
            _ => return Err(status_error(response).await),
        }

        let response = self
            .request(Method::PUT, "")
            .json(&index_mapping())
            .send()
            .await?;
        if response.status().is_success() {
            info!(index = %self.index, "created index with mapping");
            return Ok(IndexState::Created);
        }
        match status_error(response).await {
            // Lost a creation race with another instance.
            StoreError::Status { status: 400, body }
                if body.contains("resource_already_exists_exception") =>
            {
                info!(index = %self.index, "index already exists");
                Ok(IndexState::Existing)
            }
            err => Err(err),
        }
    }

    async fn index(&self, doc: &VehicleDocument) -> Result<(), StoreError> {
        let response = self.request(Method::POST, "/_doc").json(doc).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        debug!(index = %self.index, time = %doc.time, "document indexed");
        Ok(())
    }
}
