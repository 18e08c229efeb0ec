//! Vector table adapter configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vecbench_data::{SimilarityMetric, TableRef, VectorError, VectorResult};

use crate::document::{DEFAULT_DIMENSION, DEFAULT_KEYSPACE};

/// Default table of the table adapter.
pub const DEFAULT_TABLE: &str = "vector_store_benchmark_cql";
/// Default per-row time to live.
pub const DEFAULT_TTL_SECONDS: u64 = 600_000;

/// Vector table adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table holding the embeddings.
    #[serde(default = "default_table")]
    pub table_name: String,
    /// Keyspace holding the table.
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
    /// Length of every vector in the table.
    #[serde(default = "default_dimension")]
    pub vector_dimension: usize,
    /// Clear the table on construction (best effort).
    #[serde(default)]
    pub drop_old: bool,
    /// Seconds each row lives; `None` keeps rows forever.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: Option<u64>,
    /// Metric of the ANN scan.
    #[serde(default)]
    pub metric: SimilarityMetric,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_keyspace() -> String {
    DEFAULT_KEYSPACE.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_ttl_seconds() -> Option<u64> {
    Some(DEFAULT_TTL_SECONDS)
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: default_table(),
            keyspace: default_keyspace(),
            vector_dimension: DEFAULT_DIMENSION,
            drop_old: false,
            ttl_seconds: default_ttl_seconds(),
            metric: SimilarityMetric::default(),
        }
    }
}

impl TableConfig {
    /// Creates a configuration for the given table with default settings.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Sets the keyspace.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    /// Sets the vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.vector_dimension = dimension;
        self
    }

    /// Requests a best-effort clear of the table on construction.
    pub fn with_drop_old(mut self, drop_old: bool) -> Self {
        self.drop_old = drop_old;
        self
    }

    /// Sets the row TTL; `None` disables expiry.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl_seconds = ttl.map(|ttl| ttl.as_secs());
        self
    }

    /// Sets the ANN metric.
    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Row TTL, if expiry is enabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }

    /// Fully qualified table name.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.keyspace, &self.table_name)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> VectorResult<()> {
        if self.table_name.is_empty() {
            return Err(VectorError::invalid_config("table name cannot be empty"));
        }
        if self.keyspace.is_empty() {
            return Err(VectorError::invalid_config("keyspace cannot be empty"));
        }
        if self.vector_dimension == 0 {
            return Err(VectorError::invalid_config(
                "vector dimension must be greater than zero",
            ));
        }
        if self.ttl_seconds == Some(0) {
            return Err(VectorError::invalid_config("ttl must be greater than zero"));
        }
        Ok(())
    }
}
