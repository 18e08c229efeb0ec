//! Dataset files and filter arguments.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use vecbench_vector::{EmbeddingBatch, Metadata};

/// Reads and validates a dataset file.
pub fn read_dataset(path: &Path) -> anyhow::Result<EmbeddingBatch> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;
    parse_dataset(&contents).with_context(|| format!("invalid dataset {}", path.display()))
}

/// Parses a dataset document into a batch.
pub fn parse_dataset(contents: &str) -> anyhow::Result<EmbeddingBatch> {
    let batch: EmbeddingBatch = serde_json::from_str(contents)?;
    batch.validate()?;
    Ok(batch)
}

/// Parses a `key=value` filter argument.
///
/// The value is read as JSON when it parses as such (`rank=3`, `flag=true`)
/// and as a plain string otherwise.
pub fn parse_filter(arg: &str) -> Result<(String, Value), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{arg}'"))?;
    if key.is_empty() {
        return Err(format!("empty filter key in '{arg}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Collects parsed filters into a metadata map, `None` when there are none.
pub fn into_filters(filters: Vec<(String, Value)>) -> Option<Metadata> {
    if filters.is_empty() {
        None
    } else {
        Some(filters.into_iter().collect())
    }
}
