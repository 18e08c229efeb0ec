#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod document;
mod error;
mod table;
mod types;
mod vector;

pub use config::{DbConfig, ENV_API_ENDPOINT, ENV_TOKEN};
pub use document::{
    Document, DocumentApi, ID_FIELD, SIMILARITY_FIELD, UpsertOutcome, VECTOR_FIELD,
};
pub use error::{VectorError, VectorResult};
pub use table::{SimilarityMetric, TableHit, TableRef, TableRow, VectorTable};
pub use types::{
    EmbeddingBatch, EmbeddingRecord, FailedWrite, InsertReport, Metadata, SearchHit, SearchResult,
};
pub use vector::{VectorDb, effective_filters};
