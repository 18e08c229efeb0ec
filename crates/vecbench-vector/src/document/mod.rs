//! Document-oriented REST vector store adapters.
//!
//! Both adapters write through a [`DocumentApi`] in chunks of
//! [`CHUNK_SIZE`] documents with up to [`CHUNK_CONCURRENCY`] chunks in flight,
//! and differ only in how a record is shaped into a document.

mod client;
mod config;
mod flat;
mod nested;

use serde_json::Value;
use vecbench_data::{
    Document, DocumentApi, ID_FIELD, InsertReport, VECTOR_FIELD, VectorError, VectorResult,
};

pub use client::{DataApiClient, DataApiConfig};
pub use config::{DEFAULT_COLLECTION, DEFAULT_DIMENSION, DEFAULT_KEYSPACE, DocumentConfig};
pub use flat::FlatDocumentBackend;
pub use nested::NestedDocumentBackend;

use crate::batch::insert_chunked;

/// Tracing target for document store operations.
pub const TRACING_TARGET: &str = "vecbench_vector::document";

/// Documents per write request.
pub const CHUNK_SIZE: usize = 20;
/// Write requests in flight at once.
pub const CHUNK_CONCURRENCY: usize = 5;

/// Key of the text payload.
pub const DOCUMENT_FIELD: &str = "document";
/// Key of the nested metadata object.
pub const METADATA_FIELD: &str = "metadata";

/// Resets (when requested) and creates the configured collection.
///
/// A failed delete is logged and ignored: the adapter keeps working on the
/// existing collection. A failed create is returned.
async fn prepare_collection(api: &dyn DocumentApi, config: &DocumentConfig) -> VectorResult<()> {
    if config.drop_old {
        match api.delete_collection(&config.collection_name).await {
            Ok(()) => tracing::info!(
                target: TRACING_TARGET,
                collection = %config.collection_name,
                "Dropped existing collection"
            ),
            Err(error) => tracing::warn!(
                target: TRACING_TARGET,
                collection = %config.collection_name,
                error = %error,
                "Failed to drop collection, continuing with existing data"
            ),
        }
    }

    api.create_collection(&config.collection_name, config.vector_dimension)
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        collection = %config.collection_name,
        dimension = config.vector_dimension,
        "Collection ready"
    );

    Ok(())
}

/// Upserts `(id, document)` pairs in concurrent chunks.
async fn upsert_documents(
    api: &dyn DocumentApi,
    collection: &str,
    documents: Vec<(String, Document)>,
) -> InsertReport {
    let count = documents.len();
    let report = insert_chunked(documents, CHUNK_SIZE, CHUNK_CONCURRENCY, |chunk| {
        api.upsert_many(collection, chunk)
    })
    .await;

    tracing::debug!(
        target: TRACING_TARGET,
        collection = %collection,
        count,
        inserted = report.inserted().len(),
        failed = report.unwritten_count(),
        "Inserted documents"
    );

    report
}

/// Builds the `_id` / `$vector` core of a document.
fn base_document(id: &str, vector: &[f32]) -> Document {
    let mut document = Document::new();
    document.insert(ID_FIELD.to_string(), Value::from(id));
    document.insert(VECTOR_FIELD.to_string(), Value::from(vector.to_vec()));
    document
}

/// Removes and decodes the `_id` of a returned document.
fn take_id(document: &mut Document) -> VectorResult<String> {
    match document.remove(ID_FIELD) {
        Some(Value::String(id)) => Ok(id),
        Some(other) => Ok(other.to_string()),
        None => Err(VectorError::serialization("document without _id")),
    }
}

/// Removes and decodes the `$vector` of a returned document.
fn take_vector(document: &mut Document) -> VectorResult<Vec<f32>> {
    let value = document
        .remove(VECTOR_FIELD)
        .ok_or_else(|| VectorError::serialization("document without $vector"))?;
    Ok(serde_json::from_value(value)?)
}

/// Removes and decodes an optional field, mapping `null` to `None`.
fn take_optional<T: serde::de::DeserializeOwned>(
    document: &mut Document,
    key: &str,
) -> VectorResult<Option<T>> {
    match document.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use vecbench_test::MockDocumentApi;

    use super::*;

    #[tokio::test]
    async fn test_prepare_collection_swallows_delete_failure() {
        let api = MockDocumentApi::new();
        api.fail_deletes();
        let config = DocumentConfig::new("c").with_dimension(3).with_drop_old(true);

        prepare_collection(&api, &config).await.unwrap();
        assert!(api.has_collection("c"));
    }

    #[tokio::test]
    async fn test_prepare_collection_resets_data() {
        let api = Arc::new(MockDocumentApi::new());
        let config = DocumentConfig::new("c").with_dimension(1);
        prepare_collection(api.as_ref(), &config).await.unwrap();
        let doc = base_document("a", &[1.0]);
        api.upsert_many("c", vec![doc]).await.unwrap();

        prepare_collection(api.as_ref(), &config.clone().with_drop_old(true))
            .await
            .unwrap();
        assert!(api.documents("c").is_empty());
    }

    #[test]
    fn test_take_fields() {
        let mut document = base_document("a", &[1.0, 2.0]);
        document.insert(DOCUMENT_FIELD.to_string(), Value::Null);

        assert_eq!(take_id(&mut document).unwrap(), "a");
        assert_eq!(take_vector(&mut document).unwrap(), vec![1.0, 2.0]);
        assert_eq!(
            take_optional::<String>(&mut document, DOCUMENT_FIELD).unwrap(),
            None
        );
        assert!(document.is_empty());

        let mut broken = Document::new();
        broken.insert(VECTOR_FIELD.to_string(), json!("not a vector"));
        assert!(take_id(&mut broken).is_err());
        assert!(take_vector(&mut broken).is_err());
    }
}
