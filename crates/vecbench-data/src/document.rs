//! Capability trait of a document-oriented REST vector store.

use async_trait::async_trait;

use crate::error::{VectorError, VectorResult};

/// A JSON document as stored by the document API.
///
/// Reserved keys: `_id` (primary key), `$vector` (embedding) and, in search
/// responses, `$similarity`.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Key of the primary key field.
pub const ID_FIELD: &str = "_id";
/// Key of the embedding field.
pub const VECTOR_FIELD: &str = "$vector";
/// Key of the similarity score added to search responses.
pub const SIMILARITY_FIELD: &str = "$similarity";

/// Per-document result of [`DocumentApi::upsert_many`].
#[derive(Debug, Default)]
pub struct UpsertOutcome {
    /// Ids that were stored.
    pub stored: Vec<String>,
    /// Ids the store refused, each with the error it reported.
    pub rejected: Vec<(String, VectorError)>,
}

impl UpsertOutcome {
    /// Creates an outcome in which every id was stored.
    pub fn stored(ids: Vec<String>) -> Self {
        Self {
            stored: ids,
            rejected: Vec::new(),
        }
    }
}

/// Operations a document store client provides to the document adapters.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Creates a vector-enabled collection, succeeding if it already exists.
    async fn create_collection(&self, name: &str, dimension: usize) -> VectorResult<()>;

    /// Deletes a collection.
    async fn delete_collection(&self, name: &str) -> VectorResult<()>;

    /// Writes `documents` into `collection`, replacing any with the same `_id`.
    ///
    /// Returns the stored ids and the documents the store rejected. An `Err`
    /// means the whole request failed and nothing can be assumed stored.
    async fn upsert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VectorResult<UpsertOutcome>;

    /// Returns up to `limit` documents nearest to `vector`.
    ///
    /// `filter` is an equality mapping over document paths.
    async fn vector_find(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Document>,
    ) -> VectorResult<Vec<Document>>;
}
