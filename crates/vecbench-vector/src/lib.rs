#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod document;
pub mod table;

mod batch;
mod config;
mod store;

pub use config::VectorStoreConfig;
pub use document::{
    DataApiClient, DataApiConfig, DocumentConfig, FlatDocumentBackend, NestedDocumentBackend,
};
pub use store::VectorStore;
pub use table::{TableBackend, TableConfig};
// Re-export types from vecbench-data for convenience
pub use vecbench_data::{
    DbConfig, DocumentApi, EmbeddingBatch, InsertReport, Metadata, SearchHit, SearchResult,
    SimilarityMetric, VectorDb, VectorError, VectorResult, VectorTable,
};

/// Tracing target for vector store operations.
pub const TRACING_TARGET: &str = "vecbench_vector";
