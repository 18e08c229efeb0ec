//! Capability trait of a wide-column vector table.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VectorResult;
use crate::types::Metadata;

/// Fully qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    /// Keyspace holding the table.
    pub keyspace: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(keyspace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.keyspace, self.table)
    }
}

/// Similarity metric used by an ANN scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity.
    #[default]
    Cosine,
    /// Dot product.
    DotProduct,
    /// Euclidean similarity.
    Euclidean,
}

impl SimilarityMetric {
    /// Returns the metric's name as understood by the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cos",
            Self::DotProduct => "dot",
            Self::Euclidean => "l2",
        }
    }
}

/// One row of a vector table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Primary key.
    pub row_id: String,
    /// Text body, if any.
    pub body_blob: Option<String>,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Metadata, empty when none was given.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A row returned by an ANN scan with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHit {
    /// The matched row.
    pub row: TableRow,
    /// Similarity reported by the table under the requested metric.
    pub distance: f32,
}

/// Operations a wide-column vector table provides to the table adapter.
///
/// Every call is independent, so the adapter can keep several `put`s in
/// flight at once.
#[async_trait]
pub trait VectorTable: Send + Sync {
    /// Creates the table if it does not exist.
    async fn create_table(&self, table: &TableRef, dimension: usize) -> VectorResult<()>;

    /// Removes every row of the table.
    async fn clear(&self, table: &TableRef) -> VectorResult<()>;

    /// Writes one row, replacing any row with the same id, expiring after `ttl`.
    async fn put(
        &self,
        table: &TableRef,
        row: TableRow,
        ttl: Option<Duration>,
    ) -> VectorResult<()>;

    /// Returns up to `n` rows nearest to `vector` whose metadata contains
    /// every entry of `metadata`.
    async fn metric_ann_search(
        &self,
        table: &TableRef,
        vector: &[f32],
        n: usize,
        metric: SimilarityMetric,
        metadata: &Metadata,
    ) -> VectorResult<Vec<TableHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_display() {
        let table = TableRef::new("default_keyspace", "vector_store_benchmark_cql");
        assert_eq!(
            table.to_string(),
            "default_keyspace.vector_store_benchmark_cql"
        );
    }

    #[test]
    fn test_metric_default_is_cosine() {
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::Cosine);
        assert_eq!(SimilarityMetric::default().as_str(), "cos");
    }
}
