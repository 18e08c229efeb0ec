//! Vector store configuration types.

use serde::{Deserialize, Serialize};

use crate::document::DocumentConfig;

/// Configuration of a REST document store adapter.
///
/// The table adapter is not listed here: it needs an injected
/// [`VectorTable`](vecbench_data::VectorTable) handle, see
/// [`VectorStore::from_table`](crate::VectorStore::from_table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum VectorStoreConfig {
    /// Metadata merged into the top level of each document.
    Flat(DocumentConfig),
    /// Metadata kept under a `metadata` sub-object.
    Nested(DocumentConfig),
}

impl VectorStoreConfig {
    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Flat(_) => "flat",
            Self::Nested(_) => "nested",
        }
    }

    /// Returns the document adapter configuration.
    pub fn document_config(&self) -> &DocumentConfig {
        match self {
            Self::Flat(config) | Self::Nested(config) => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_deserialization() {
        let config: VectorStoreConfig =
            serde_json::from_str(r#"{"type": "nested", "collection_name": "c"}"#).unwrap();
        assert_eq!(config.backend_name(), "nested");
        assert_eq!(config.document_config().collection_name, "c");
        assert_eq!(config.document_config().vector_dimension, 1536);
    }
}
