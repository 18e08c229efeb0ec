//! Unified vector store facade.

use std::sync::Arc;

use async_trait::async_trait;
use vecbench_data::{
    DbConfig, EmbeddingBatch, InsertReport, Metadata, SearchResult, VectorDb, VectorResult,
    VectorTable,
};

use crate::TRACING_TARGET;
use crate::config::VectorStoreConfig;
use crate::document::{FlatDocumentBackend, NestedDocumentBackend};
use crate::table::{TableBackend, TableConfig};

/// Vector store that wraps one of the adapters behind [`VectorDb`].
pub struct VectorStore {
    backend_name: &'static str,
    backend: Box<dyn VectorDb>,
}

impl VectorStore {
    /// Connects a REST document adapter from configuration.
    pub async fn new(db: &DbConfig, config: VectorStoreConfig) -> VectorResult<Self> {
        let backend_name = config.backend_name();
        let backend: Box<dyn VectorDb> = match config {
            VectorStoreConfig::Flat(cfg) => Box::new(FlatDocumentBackend::connect(db, cfg).await?),
            VectorStoreConfig::Nested(cfg) => {
                Box::new(NestedDocumentBackend::connect(db, cfg).await?)
            }
        };

        tracing::info!(
            target: TRACING_TARGET,
            backend = %backend_name,
            "Vector store initialized"
        );

        Ok(Self::from_backend(backend_name, backend))
    }

    /// Wraps the table adapter over an injected table handle.
    pub async fn from_table(
        table: Arc<dyn VectorTable>,
        config: TableConfig,
    ) -> VectorResult<Self> {
        let backend = TableBackend::new(table, config).await?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = "table",
            "Vector store initialized"
        );

        Ok(Self::from_backend("table", Box::new(backend)))
    }

    /// Wraps an already constructed adapter.
    pub fn from_backend(backend_name: &'static str, backend: Box<dyn VectorDb>) -> Self {
        Self {
            backend_name,
            backend,
        }
    }

    /// Returns the name of the wrapped adapter.
    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Returns the wrapped adapter.
    pub fn backend(&self) -> &dyn VectorDb {
        self.backend.as_ref()
    }
}

#[async_trait]
impl VectorDb for VectorStore {
    async fn insert_embeddings(&self, batch: EmbeddingBatch) -> VectorResult<InsertReport> {
        tracing::debug!(
            target: TRACING_TARGET,
            backend = %self.backend_name,
            count = batch.len(),
            "Inserting embeddings"
        );
        self.backend.insert_embeddings(batch).await
    }

    async fn search_embedding(
        &self,
        query: &[f32],
        k: usize,
        filters: Option<&Metadata>,
    ) -> VectorResult<SearchResult> {
        tracing::debug!(
            target: TRACING_TARGET,
            backend = %self.backend_name,
            k,
            filtered = filters.is_some_and(|f| !f.is_empty()),
            "Searching embeddings"
        );
        self.backend.search_embedding(query, k, filters).await
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("backend", &self.backend_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use vecbench_data::VectorError;
    use vecbench_test::{MockDocumentApi, MockVectorTable};

    use super::*;
    use crate::document::DocumentConfig;

    fn batch() -> EmbeddingBatch {
        EmbeddingBatch::new(
            vec!["doc1".into(), "doc2".into()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .with_documents(vec!["text1".into(), "text2".into()])
    }

    async fn stores() -> Vec<VectorStore> {
        let config = DocumentConfig::new("store").with_dimension(3);
        let flat = FlatDocumentBackend::new(Arc::new(MockDocumentApi::new()), config.clone())
            .await
            .unwrap();
        let nested = NestedDocumentBackend::new(Arc::new(MockDocumentApi::new()), config)
            .await
            .unwrap();
        let table = VectorStore::from_table(
            Arc::new(MockVectorTable::new()),
            TableConfig::default().with_dimension(3),
        )
        .await
        .unwrap();

        vec![
            VectorStore::from_backend("flat", Box::new(flat)),
            VectorStore::from_backend("nested", Box::new(nested)),
            table,
        ]
    }

    #[tokio::test]
    async fn test_adapters_are_substitutable() {
        for store in stores().await {
            let report = store.insert_embeddings(batch()).await.unwrap();
            assert!(report.is_complete(), "{}", store.backend_name());

            let result = store
                .search_embedding(&[1.0, 2.0, 3.0], 1, None)
                .await
                .unwrap();
            assert_eq!(result.ids(), ["doc1"], "{}", store.backend_name());
            assert_eq!(result.documents(), [Some("text1".to_string())]);
        }
    }

    #[tokio::test]
    async fn test_connect_requires_endpoint() {
        let db = DbConfig::new("token");
        let config = VectorStoreConfig::Flat(DocumentConfig::default());
        let err = VectorStore::new(&db, config).await.unwrap_err();
        assert!(matches!(err, VectorError::InvalidConfig(_)));
    }
}
