//! Document store adapter configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use vecbench_data::{VectorError, VectorResult};

/// Default collection of the document adapters.
pub const DEFAULT_COLLECTION: &str = "vector_store_benchmark";
/// Default vector dimension.
pub const DEFAULT_DIMENSION: usize = 1536;
/// Default keyspace.
pub const DEFAULT_KEYSPACE: &str = "default_keyspace";

/// Configuration shared by both document adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DocumentConfig {
    /// Collection holding the embeddings.
    #[cfg_attr(
        feature = "config",
        arg(long = "collection", env = "VECBENCH_COLLECTION", default_value = DEFAULT_COLLECTION)
    )]
    #[serde(default = "default_collection")]
    pub collection_name: String,

    /// Length of every vector in the collection.
    #[cfg_attr(
        feature = "config",
        arg(long = "dimension", env = "VECBENCH_DIMENSION", default_value_t = DEFAULT_DIMENSION)
    )]
    #[serde(default = "default_dimension")]
    pub vector_dimension: usize,

    /// Delete and recreate the collection on construction (best effort).
    #[cfg_attr(feature = "config", arg(long = "drop-old", env = "VECBENCH_DROP_OLD"))]
    #[serde(default)]
    pub drop_old: bool,

    /// Keyspace (namespace) holding the collection.
    #[cfg_attr(
        feature = "config",
        arg(long = "keyspace", env = "VECBENCH_KEYSPACE", default_value = DEFAULT_KEYSPACE)
    )]
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_keyspace() -> String {
    DEFAULT_KEYSPACE.to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection(),
            vector_dimension: DEFAULT_DIMENSION,
            drop_old: false,
            keyspace: default_keyspace(),
        }
    }
}

impl DocumentConfig {
    /// Creates a configuration for the given collection with default settings.
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    /// Sets the vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.vector_dimension = dimension;
        self
    }

    /// Requests a best-effort reset of the collection on construction.
    pub fn with_drop_old(mut self, drop_old: bool) -> Self {
        self.drop_old = drop_old;
        self
    }

    /// Sets the keyspace.
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> VectorResult<()> {
        if self.collection_name.is_empty() {
            return Err(VectorError::invalid_config("collection name cannot be empty"));
        }
        if self.keyspace.is_empty() {
            return Err(VectorError::invalid_config("keyspace cannot be empty"));
        }
        if self.vector_dimension == 0 {
            return Err(VectorError::invalid_config(
                "vector dimension must be greater than zero",
            ));
        }
        Ok(())
    }
}
