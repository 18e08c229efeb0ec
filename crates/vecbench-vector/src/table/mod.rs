//! Wide-column vector table adapter.

mod backend;
mod config;

pub use backend::TableBackend;
pub use config::{DEFAULT_TABLE, DEFAULT_TTL_SECONDS, TableConfig};

/// Tracing target for vector table operations.
pub const TRACING_TARGET: &str = "vecbench_vector::table";

/// Rows written concurrently before the next batch starts.
pub const BATCH_SIZE: usize = 16;
