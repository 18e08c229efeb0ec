//! Document adapter that keeps metadata under a `metadata` sub-object.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vecbench_data::{
    DbConfig, Document, DocumentApi, EmbeddingBatch, EmbeddingRecord, InsertReport, Metadata,
    SearchHit, SearchResult, VectorDb, VectorResult, effective_filters,
};

use super::{
    DOCUMENT_FIELD, DataApiClient, DataApiConfig, DocumentConfig, METADATA_FIELD, TRACING_TARGET,
    base_document, prepare_collection, take_id, take_optional, take_vector, upsert_documents,
};

/// Document store adapter with nested metadata.
///
/// Each record becomes `{"_id", "$vector"}` plus `"document"` and
/// `"metadata"` when they were supplied. Filters are rewritten to address
/// `metadata.<key>`.
pub struct NestedDocumentBackend {
    api: Arc<dyn DocumentApi>,
    config: DocumentConfig,
}

impl NestedDocumentBackend {
    /// Creates the adapter over `api`, resetting and creating the collection.
    pub async fn new(api: Arc<dyn DocumentApi>, config: DocumentConfig) -> VectorResult<Self> {
        config.validate()?;
        prepare_collection(api.as_ref(), &config).await?;

        tracing::info!(
            target: TRACING_TARGET,
            collection = %config.collection_name,
            "Nested document backend initialized"
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
        if let Some(text) = record.document {
            document.insert(DOCUMENT_FIELD.to_string(), Value::String(text));
        }
        if let Some(metadata) = record.metadata {
            document.insert(
                METADATA_FIELD.to_string(),
                Value::Object(metadata.into_iter().collect()),
            );
        }
        document
    }

    fn to_filter(filters: &Metadata) -> Document {
        filters
            .iter()
            .map(|(key, value)| (format!("{METADATA_FIELD}.{key}"), value.clone()))
            .collect()
    }

    fn parse_document(mut document: Document) -> VectorResult<SearchHit> {
        Ok(SearchHit {
            id: take_id(&mut document)?,
            embedding: take_vector(&mut document)?,
            document: take_optional(&mut document, DOCUMENT_FIELD)?,
            metadata: take_optional(&mut document, METADATA_FIELD)?,
            similarity: None,
        })
    }
}

impl std::fmt::Debug for NestedDocumentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedDocumentBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorDb for NestedDocumentBackend {
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

        let filter = effective_filters(filters).map(Self::to_filter);

        let documents = self
            .api
            .vector_find(&self.config.collection_name, query, k, filter)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            collection = %self.config.collection_name,
            k,
            found = documents.len(),
            "Searched nested documents"
        );

        documents.into_iter().map(Self::parse_document).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vecbench_test::MockDocumentApi;

    use super::*;

    fn metadata(value: &str) -> Metadata {
        Metadata::from([("key".to_string(), json!(value))])
    }

    async fn backend(api: &MockDocumentApi) -> NestedDocumentBackend {
        let config = DocumentConfig::new("nested").with_dimension(3);
        NestedDocumentBackend::new(Arc::new(api.clone()), config)
            .await
            .unwrap()
    }

    async fn seed(backend: &NestedDocumentBackend) {
        let batch = EmbeddingBatch::new(
            vec!["doc1".into(), "doc2".into(), "doc3".into()],
            vec![
                vec![1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0],
                vec![3.0, 5.0, 6.0],
            ],
        )
        .with_documents(vec!["text1".into(), "text2".into(), "text3".into()])
        .with_metadata(vec![metadata("value"), metadata("value"), metadata("val")]);

        backend.insert_embeddings(batch).await.unwrap();
    }

    #[test]
    fn test_filter_rewrite() {
        let filter = NestedDocumentBackend::to_filter(&metadata("value"));
        assert_eq!(Value::Object(filter), json!({"metadata.key": "value"}));
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let document = NestedDocumentBackend::to_document(EmbeddingRecord {
            id: "a".into(),
            vector: vec![1.0],
            document: None,
            metadata: None,
        });
        assert_eq!(
            Value::Object(document),
            json!({"_id": "a", "$vector": [1.0]})
        );
    }

    #[tokio::test]
    async fn test_round_trip_with_nested_metadata() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        assert_eq!(api.documents("nested")[0]["metadata"], json!({"key": "value"}));

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 1, None)
            .await
            .unwrap();
        assert_eq!(result.ids(), ["doc1"]);
        assert_eq!(result.documents(), [Some("text1".to_string())]);
        assert_eq!(result.metadatas(), [Some(metadata("value"))]);
        assert_eq!(result.embeddings(), [vec![1.0, 2.0, 3.0]]);
    }

    #[tokio::test]
    async fn test_filter_matches_nested_key() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        let result = backend
            .search_embedding(&[3.0, 5.0, 6.0], 10, Some(&metadata("value")))
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        assert!(!result.ids().iter().any(|id| id == "doc3"));

        let unfiltered = backend
            .search_embedding(&[3.0, 5.0, 6.0], 10, Some(&Metadata::new()))
            .await
            .unwrap();
        assert_eq!(unfiltered.ids()[0], "doc3");
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_fields_read_back_as_none() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let batch = EmbeddingBatch::new(
            vec!["doc4".into(), "doc5".into()],
            vec![vec![700.0, 800.0, 300.0], vec![1.0, 1.0, 1.0]],
        );
        backend.insert_embeddings(batch).await.unwrap();

        let result = backend
            .search_embedding(&[700.0, 800.0, 300.0], 2, None)
            .await
            .unwrap();
        assert_eq!(result.ids()[0], "doc4");
        assert_eq!(result.documents(), [None, None]);
        assert_eq!(result.metadatas(), [None, None]);
    }

    #[tokio::test]
    async fn test_chunk_boundary() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;

        let n = 21;
        let batch = EmbeddingBatch::new(
            (0..n).map(|i| format!("doc{i}")).collect(),
            (0..n).map(|i| vec![i as f32, 1.0, 1.0]).collect(),
        );
        let report = backend.insert_embeddings(batch).await.unwrap();
        assert!(report.is_complete());
        assert_eq!(api.chunk_sizes(), [20, 1]);
        assert_eq!(api.documents("nested").len(), 21);
    }

    #[tokio::test]
    async fn test_zero_k_returns_empty() {
        let api = MockDocumentApi::new();
        let backend = backend(&api).await;
        seed(&backend).await;

        let result = backend
            .search_embedding(&[1.0, 2.0, 3.0], 0, None)
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
