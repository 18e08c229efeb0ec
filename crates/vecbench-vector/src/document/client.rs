//! HTTP client for the JSON document API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;
use vecbench_data::{
    DbConfig, Document, DocumentApi, ID_FIELD, UpsertOutcome, VECTOR_FIELD, VectorError,
    VectorResult,
};

use super::{DEFAULT_KEYSPACE, TRACING_TARGET};

/// Default timeout for document API requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path prefix of the JSON API.
const API_PATH: &str = "api/json/v1";

/// Error code returned for an `_id` that is already stored.
const DOCUMENT_ALREADY_EXISTS: &str = "DOCUMENT_ALREADY_EXISTS";

/// Configuration of the [`DataApiClient`].
#[derive(Clone, PartialEq)]
pub struct DataApiConfig {
    /// Base endpoint of the database.
    pub api_endpoint: String,
    /// Application token sent in the `Token` header.
    pub token: String,
    /// Keyspace holding the collections.
    pub keyspace: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header; defaults to `vecbench/<version>`.
    pub user_agent: Option<String>,
}

impl DataApiConfig {
    /// Creates a configuration for the default keyspace.
    pub fn new(api_endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            token: token.into(),
            keyspace: DEFAULT_KEYSPACE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Builds a configuration from connection parameters.
    pub fn from_db_config(db: &DbConfig) -> VectorResult<Self> {
        Ok(Self::new(db.require_api_endpoint()?, db.token.clone()))
    }

    /// Sets the keyspace.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the effective timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Returns the effective user agent.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| format!("vecbench/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Returns the keyspace URL, e.g. `https://host/api/json/v1/default_keyspace`.
    fn keyspace_url(&self) -> VectorResult<Url> {
        let base = Url::parse(&self.api_endpoint)
            .map_err(|e| VectorError::invalid_config(format!("invalid API endpoint: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(VectorError::invalid_config(
                "API endpoint must start with http:// or https://",
            ));
        }
        let path = format!(
            "{}/{API_PATH}/{}",
            base.path().trim_end_matches('/'),
            self.keyspace
        );
        let mut url = base;
        url.set_path(&path);
        Ok(url)
    }
}

impl std::fmt::Debug for DataApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataApiConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("keyspace", &self.keyspace)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct DataApiClientInner {
    http: Client,
    keyspace_url: Url,
    config: DataApiConfig,
}

/// [`DocumentApi`] over the JSON document API.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Clone)]
pub struct DataApiClient {
    inner: Arc<DataApiClientInner>,
}

impl std::fmt::Debug for DataApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataApiClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl DataApiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the HTTP
    /// client cannot be built.
    pub fn new(config: DataApiConfig) -> VectorResult<Self> {
        let keyspace_url = config.keyspace_url()?;
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET,
            url = %keyspace_url,
            timeout_ms = timeout.as_millis(),
            "Creating document API client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()
            .map_err(|e| VectorError::connection(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(DataApiClientInner {
                http,
                keyspace_url,
                config,
            }),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &DataApiConfig {
        &self.inner.config
    }

    fn collection_url(&self, collection: &str) -> Url {
        let mut url = self.inner.keyspace_url.clone();
        let path = format!("{}/{collection}", url.path());
        url.set_path(&path);
        url
    }

    /// Posts one command and decodes the response envelope.
    async fn command(&self, url: Url, body: Value) -> VectorResult<ApiResponse> {
        let response = self
            .inner
            .http
            .post(url)
            .header("Token", &self.inner.config.token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(VectorError::authentication(format!(
                "document API answered {status}"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VectorError::backend_with_code(
                status.as_str(),
                text.chars().take(1024).collect::<String>(),
            ));
        }

        response.json().await.map_err(map_transport_error)
    }

    /// Replaces one document by `_id`, inserting it if absent.
    async fn replace_one(&self, collection: &str, document: Document) -> VectorResult<()> {
        let url = self.collection_url(collection);
        self.command(url, find_one_and_replace_command(document))
            .await?
            .into_result()
            .map(|_| ())
    }
}

#[async_trait]
impl DocumentApi for DataApiClient {
    async fn create_collection(&self, name: &str, dimension: usize) -> VectorResult<()> {
        let url = self.inner.keyspace_url.clone();
        self.command(url, create_collection_command(name, dimension))
            .await?
            .into_result()?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> VectorResult<()> {
        let url = self.inner.keyspace_url.clone();
        self.command(url, delete_collection_command(name))
            .await?
            .into_result()?;
        Ok(())
    }

    async fn upsert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VectorResult<UpsertOutcome> {
        let url = self.collection_url(collection);
        let response = self
            .command(url, insert_many_command(&documents))
            .await?;

        let stored = response.inserted_ids();
        let (duplicates, errors): (Vec<ApiError>, Vec<ApiError>) = response
            .errors
            .into_iter()
            .partition(|e| e.error_code.as_deref() == Some(DOCUMENT_ALREADY_EXISTS));

        if stored.is_empty() && duplicates.is_empty() {
            if let Some(error) = errors.into_iter().next() {
                return Err(error.into_vector_error());
            }
        } else if !errors.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET,
                collection = %collection,
                errors = errors.len(),
                first = %errors[0].message,
                "Document API rejected part of the chunk"
            );
        }

        // insertMany errors do not name their documents; leftovers are
        // written one by one.
        let inserted: HashSet<String> = stored.iter().cloned().collect();
        let mut outcome = UpsertOutcome::stored(stored);
        for document in documents {
            let Some(id) = document.get(ID_FIELD).and_then(Value::as_str) else {
                continue;
            };
            if inserted.contains(id) {
                continue;
            }
            let id = id.to_string();
            match self.replace_one(collection, document).await {
                Ok(()) => outcome.stored.push(id),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        collection = %collection,
                        id = %id,
                        error = %error,
                        "Failed to write document"
                    );
                    outcome.rejected.push((id, error));
                }
            }
        }

        Ok(outcome)
    }

    async fn vector_find(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Document>,
    ) -> VectorResult<Vec<Document>> {
        let url = self.collection_url(collection);
        let response = self
            .command(url, find_command(vector, limit, filter))
            .await?
            .into_result()?;
        Ok(response.data.map(|d| d.documents).unwrap_or_default())
    }
}

fn create_collection_command(name: &str, dimension: usize) -> Value {
    json!({
        "createCollection": {
            "name": name,
            "options": {"vector": {"dimension": dimension, "metric": "cosine"}}
        }
    })
}

fn delete_collection_command(name: &str) -> Value {
    json!({"deleteCollection": {"name": name}})
}

fn insert_many_command(documents: &[Document]) -> Value {
    json!({"insertMany": {"documents": documents, "options": {"ordered": false}}})
}

fn find_one_and_replace_command(document: Document) -> Value {
    let id = document.get(ID_FIELD).cloned().unwrap_or(Value::Null);
    json!({
        "findOneAndReplace": {
            "filter": {ID_FIELD: id},
            "replacement": document,
            "options": {"upsert": true}
        }
    })
}

fn find_command(vector: &[f32], limit: usize, filter: Option<Document>) -> Value {
    json!({
        "find": {
            "filter": filter.unwrap_or_default(),
            "sort": {VECTOR_FIELD: vector},
            "projection": {"*": 1},
            "options": {"limit": limit}
        }
    })
}

/// Response envelope shared by every command.
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: Option<ApiStatus>,
    #[serde(default)]
    data: Option<ApiData>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiStatus {
    #[serde(default, rename = "insertedIds")]
    inserted_ids: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiData {
    #[serde(default)]
    documents: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
}

impl ApiResponse {
    /// Fails on the first reported error.
    fn into_result(mut self) -> VectorResult<Self> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors.remove(0).into_vector_error())
        }
    }

    fn inserted_ids(&self) -> Vec<String> {
        self.status
            .as_ref()
            .map(|s| {
                s.inserted_ids
                    .iter()
                    .map(|id| match id {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ApiError {
    fn into_vector_error(self) -> VectorError {
        let code = self.error_code.unwrap_or_default();
        let is_dimension = code.contains("VECTOR_SIZE")
            || code.contains("VECTOR_LENGTH")
            || code.contains("DIMENSION")
            || self.message.to_lowercase().contains("dimension");

        if is_dimension {
            VectorError::DimensionMismatch(self.message)
        } else if code == "COLLECTION_NOT_EXIST" {
            VectorError::collection_not_found(self.message)
        } else if code.is_empty() {
            VectorError::backend(self.message)
        } else {
            VectorError::backend_with_code(code, self.message)
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> VectorError {
    if err.is_timeout() {
        VectorError::timeout(err.to_string())
    } else if err.is_connect() {
        VectorError::connection(err.to_string())
    } else if err.is_decode() {
        VectorError::serialization(err.to_string())
    } else {
        VectorError::backend(err.to_string())
    }
}
