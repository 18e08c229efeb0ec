//! Document adapter that merges metadata into the top level of each document.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vecbench_data::{
    DbConfig, Document, DocumentApi, EmbeddingBatch, EmbeddingRecord, InsertReport, Metadata,
    SIMILARITY_FIELD, SearchHit, SearchResult, VectorDb, VectorResult, effective_filters,
};

use super::{
    DOCUMENT_FIELD, DataApiClient, DataApiConfig, DocumentConfig, TRACING_TARGET, base_document,
    prepare_collection, take_id, take_optional, take_vector, upsert_documents,
};

/// Document store adapter with flattened metadata.
///
/// Each record becomes `{"_id", "document", "$vector", ...metadata}`. Metadata
/// keys are spread last, so a key named `_id`, `document` or `$vector`
/// overwrites the reserved field. Collections written by this adapter depend
/// on that shape, so the collision is logged rather than prevented.
///
/// Filters are sent unchanged and match top-level keys.
pub struct FlatDocumentBackend {
    api: Arc<dyn DocumentApi>,
    config: DocumentConfig,
}

impl FlatDocumentBackend {
    /// Creates the adapter over `api`, resetting and creating the collection.
    pub async fn new(api: Arc<dyn DocumentApi>, config: DocumentConfig) -> VectorResult<Self> {
        config.validate()?;
        prepare_collection(api.as_ref(), &config).await?;

        tracing::info!(
            target: TRACING_TARGET,
            collection = %config.collection_name,
            "Flat document backend initialized"
        );

        Ok(Self { api, config })
    }

    /// Creates the adapter over a [`DataApiClient`] built from `db`.
    pub async fn connect(db: &DbConfig, config: DocumentConfig) -> VectorResult<Self> {
        let client_config = DataApiConfig::from_db_config(db)?.with_keyspace(&config.keyspace);
        let client = DataApiClient::new(client_config)?;
        Self::new(Arc::new(client), config).await
    }

    /// Gets the adapter configuration.
    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    fn to_document(record: EmbeddingRecord) -> Document {
        let mut document = base_document(&record.id, &record.vector);
        document.insert(
            DOCUMENT_FIELD.to_string(),
            record.document.map_or(Value::Null, Value::String),
        );

        for (key, value) in record.metadata.unwrap_or_default() {
            if document.contains_key(&key) {
                tracing::warn!(
                    target: TRACING_TARGET,
                    id = %record.id,
                    key = %key,
                    "Metadata key overwrites a reserved document field"
                );
            }
            document.insert(key, value);
        }

        document
    }

    fn parse_document(mut document: Document) -> VectorResult<SearchHit> {
        let id = take_id(&mut document)?;
        let embedding = take_vector(&mut document)?;
        let text = take_optional(&mut document, DOCUMENT_FIELD)?;
        document.remove(SIMILARITY_FIELD);

        let metadata = if document.is_empty() {
            None
        } else {
            Some(document.into_iter().collect::<Metadata>())
        };

        Ok(SearchHit {
            id,
            embedding,
            document: text,
            metadata,
            similarity: None,
        })
    }
}

impl std::fmt::Debug for FlatDocumentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatDocumentBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorDb for FlatDocumentBackend {
    async fn insert_embeddings(&self, batch: EmbeddingBatch) -> VectorResult<InsertReport> {
        let documents: Vec<(String, Document)> = batch
            .into_records()?
            .into_iter()
            .map(|record| (record.id.clone(), Self::to_document(record)))
            .collect();

        if documents.is_empty() {
            return Ok(InsertReport::new());
        }

        Ok(upsert_documents(self.api.as_ref(), &self.config.collection_name, documents).await)
    }

    async fn search_embedding(
        &self,
        query: &[f32],
        k: usize,
        filters: Option<&Metadata>,
    ) -> VectorResult<SearchResult> {
        if k == 0 {
            return Ok(SearchResult::empty());
        }

        let filter = effective_filters(filters).map(|f| f.clone().into_iter().collect::<Document>());

        let documents = self
            .api
            .vector_find(&self.config.collection_name, query, k, filter)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %self.config.collection_name,
            k,
            found = documents.len(),
            "Searched flat documents"
        );

        documents.into_iter().map(Self::parse_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vecbench_data::VectorError;
    use vecbench_test::MockDocumentApi;

    use super::*;

    fn metadata(value: &str) -> Metadata {
        Metadata::from([("key".to_string(), json!(value))])
    }

    async fn backend(api: &MockDocumentApi) -> FlatDocumentBackend {
        let config = DocumentConfig::new("flat").with_dimension(3);
        FlatDocumentBackend::new(Arc::new(api.clone()), config)
            .await
            .unwrap()
    }

    async fn seed(backend: &FlatDocumentBackend) {
        let batch = EmbeddingBatch::new(
            vec!["doc1".into(), "doc2".into(), "doc3".into()],
            vec![
                vec![1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0],
                vec![3.0, 5.0, 6.0],
            ],
        )
        .with_documents(vec!["text1".into(), "text2".into(), String::new()])
        .with_metadata(vec![metadata("value"), metadata("value"), metadata("val")]);

        let report = backend.insert_embeddings(batch).await.unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_document_shape_is_flat() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        let stored = api.documents("flat");
        assert_eq!(stored[0]["_id"], json!("doc1"));
        assert_eq!(stored[0]["document"], json!("text1"));
        assert_eq!(stored[0]["key"], json!("value"));
        assert!(!stored[0].contains_key("metadata"));
    }

    #[tokio::test]
    async fn test_round_trip_and_ranking() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 2, None)
            .await
            .unwrap();
        assert_eq!(result.ids(), ["doc1", "doc3"]);
        assert_eq!(
            result.documents(),
            [Some("text1".to_string()), Some(String::new())]
        );
        assert_eq!(result.metadatas()[0], Some(metadata("value")));
        assert!(result.similarity().is_none());
    }

    #[tokio::test]
    async fn test_filter_is_passed_raw() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 2, Some(&metadata("value")))
            .await
            .unwrap();
        assert_eq!(result.ids(), ["doc1", "doc2"]);
    }

    #[tokio::test]
    async fn test_missing_documents_read_back_as_none() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = EmbeddingBatch::new(vec!["doc4".into()], vec![vec![700.0, 800.0, 300.0]]);
        backend.insert_embeddings(batch).await.unwrap();

        assert_eq!(api.documents("flat")[0]["document"], Value::Null);

        let result = backend
            .search_embedding(&[700.0, 800.0, 300.0], 1, None)
            .await
            .unwrap();
        assert_eq!(result.ids(), ["doc4"]);
        assert_eq!(result.documents(), [None]);
        assert_eq!(result.metadatas(), [None]);
    }

    #[tokio::test]
    async fn test_reserved_key_collision_overwrites() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = EmbeddingBatch::new(vec!["doc1".into()], vec![vec![1.0, 0.0, 0.0]])
            .with_documents(vec!["original".into()])
            .with_metadata(vec![Metadata::from([(
                "document".to_string(),
                json!("from metadata"),
            )])]);
        backend.insert_embeddings(batch).await.unwrap();

        assert_eq!(api.documents("flat")[0]["document"], json!("from metadata"));
    }

    #[tokio::test]
    async fn test_empty_collection_and_empty_insert() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let report = backend
            .insert_embeddings(EmbeddingBatch::default())
            .await
            .unwrap();
        assert_eq!(report.total(), 0);
        assert!(api.chunk_sizes().is_empty());

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 10, None)
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_reported_per_chunk() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = EmbeddingBatch::new(vec!["short".into()], vec![vec![1.0]]);
        let report = backend.insert_embeddings(batch).await.unwrap();
        assert!(matches!(
            report.failures()[0].error,
            VectorError::DimensionMismatch(_)
        ));

        let err = backend.search_embedding(&[1.0], 1, None).await.unwrap_err();
        assert!(matches!(err, VectorError::DimensionMismatch(_)));
    }

    #[tokio::test]
    async fn test_rejected_document_keeps_its_error() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = EmbeddingBatch::new(
            vec!["doc1".into(), "short".into(), "doc2".into()],
            vec![vec![1.0, 2.0, 3.0], vec![1.0], vec![4.0, 5.0, 6.0]],
        );
        let report = backend.insert_embeddings(batch).await.unwrap();

        assert_eq!(report.inserted(), ["doc1", "doc2"]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].ids, ["short"]);
        assert!(matches!(
            report.failures()[0].error,
            VectorError::DimensionMismatch(_)
        ));
    }

    fn numbered(n: usize) -> EmbeddingBatch {
        EmbeddingBatch::new(
            (0..n).map(|i| format!("doc{i}")).collect(),
            (0..n).map(|i| vec![1.0, i as f32, 0.5]).collect(),
        )
    }

    #[tokio::test]
    async fn test_chunk_boundary_and_idempotence() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let report = backend.insert_embeddings(numbered(21)).await.unwrap();
        assert_eq!(report.inserted().len(), 21);
        assert_eq!(api.chunk_sizes(), [20, 1]);

        backend.insert_embeddings(numbered(21)).await.unwrap();
        let result = backend
            .search_embedding(&[1.0, 0.0, 0.5], 100, None)
            .await
            .unwrap();
        assert_eq!(result.len(), 21);
        let mut ids = result.ids().to_vec();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 21);
    }

    #[tokio::test]
    async fn test_chunks_run_five_at_a_time() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        backend.insert_embeddings(numbered(200)).await.unwrap();
        assert_eq!(api.chunk_sizes().len(), 10);
        assert_eq!(api.max_concurrent_writes(), 5);
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_per_chunk() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        api.fail_writes_containing("doc25");

        let report = backend.insert_embeddings(numbered(45)).await.unwrap();
        assert_eq!(report.inserted().len(), 25);
        assert_eq!(report.unwritten_count(), 20);
        assert!(report.failed_ids().any(|id| id == "doc25"));
        assert!(matches!(
            report.into_result(),
            Err(VectorError::PartialFailure {
                failed: 20,
                total: 45
            })
        ));
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_rejected() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = numbered(2).with_documents(vec!["only one".into()]);
        let err = backend.insert_embeddings(batch).await.unwrap_err();
        assert!(matches!(err, VectorError::InvalidInput(_)));
        assert!(api.chunk_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_drop_old_failure_is_not_fatal() {
        let api = MockDocumentApi::new();
        seed(&backend(&api).await).await;
        api.fail_deletes();

        let config = DocumentConfig::new("flat")
            .with_dimension(3)
            .with_drop_old(true);
        let backend = FlatDocumentBackend::new(Arc::new(api.clone()), config)
            .await
            .unwrap();

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 10, None)
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
    }
}
