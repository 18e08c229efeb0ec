//! The VectorDB contract implemented by every backend adapter.

use async_trait::async_trait;

use crate::error::VectorResult;
use crate::types::{EmbeddingBatch, InsertReport, Metadata, SearchResult};

/// Uniform capability set of a vector database backend.
///
/// Implementations are interchangeable: a caller holding a `dyn VectorDb`
/// never needs to know which store sits behind it.
#[async_trait]
pub trait VectorDb: Send + Sync {
    /// Writes or overwrites every record of `batch`, keyed by id.
    ///
    /// An empty batch is a no-op. The write is not atomic: the returned
    /// report names the ids that were written and those that were not.
    /// Malformed batches (sequences of different lengths) are rejected
    /// before anything is sent.
    async fn insert_embeddings(&self, batch: EmbeddingBatch) -> VectorResult<InsertReport>;

    /// Returns up to `k` records nearest to `query`, nearest first.
    ///
    /// When `filters` is given and non-empty, only records whose metadata
    /// matches every key/value pair are eligible. Zero matches yield an
    /// empty result, not an error.
    async fn search_embedding(
        &self,
        query: &[f32],
        k: usize,
        filters: Option<&Metadata>,
    ) -> VectorResult<SearchResult>;
}

/// Returns the filters to apply, treating an empty mapping as no filter.
pub fn effective_filters(filters: Option<&Metadata>) -> Option<&Metadata> {
    filters.filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_filters_are_ignored() {
        assert!(effective_filters(None).is_none());
        assert!(effective_filters(Some(&Metadata::new())).is_none());

        let filters = Metadata::from([("key".to_string(), json!("value"))]);
        assert_eq!(effective_filters(Some(&filters)), Some(&filters));
    }
}
