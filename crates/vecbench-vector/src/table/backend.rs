//! Vector table adapter implementation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use vecbench_data::{
    EmbeddingBatch, InsertReport, Metadata, SearchHit, SearchResult, TableHit, TableRef, TableRow,
    VectorDb, VectorResult, VectorTable,
};

use super::{BATCH_SIZE, TRACING_TARGET, TableConfig};
use crate::batch::into_chunks;

/// Wide-column vector table adapter.
///
/// Rows are written in batches of [`BATCH_SIZE`]: every row of a batch is an
/// independent `put`, and a batch finishes before the next one starts. The
/// first failing batch stops the load; later rows are reported as skipped.
pub struct TableBackend {
    table: Arc<dyn VectorTable>,
    config: TableConfig,
    table_ref: TableRef,
}

impl TableBackend {
    /// Creates the adapter, creating the table and clearing it if requested.
    pub async fn new(table: Arc<dyn VectorTable>, config: TableConfig) -> VectorResult<Self> {
        config.validate()?;
        let table_ref = config.table_ref();

        table
            .create_table(&table_ref, config.vector_dimension)
            .await?;

        if config.drop_old {
            match table.clear(&table_ref).await {
                Ok(()) => tracing::info!(
                    target: TRACING_TARGET,
                    table = %table_ref,
                    "Cleared existing table"
                ),
                Err(error) => tracing::warn!(
                    target: TRACING_TARGET,
                    table = %table_ref,
                    error = %error,
                    "Failed to clear table, continuing with existing data"
                ),
            }
        }

        tracing::info!(
            target: TRACING_TARGET,
            table = %table_ref,
            dimension = config.vector_dimension,
            metric = config.metric.as_str(),
            "Table backend initialized"
        );

        Ok(Self {
            table,
            config,
            table_ref,
        })
    }

    /// Gets the adapter configuration.
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    fn to_hit(hit: TableHit) -> SearchHit {
        let TableHit { row, distance } = hit;
        SearchHit {
            id: row.row_id,
            embedding: row.vector,
            document: row.body_blob,
            metadata: Some(row.metadata),
            similarity: Some(distance),
        }
    }
}

impl std::fmt::Debug for TableBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBackend")
            .field("table", &self.table_ref)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VectorDb for TableBackend {
    async fn insert_embeddings(&self, batch: EmbeddingBatch) -> VectorResult<InsertReport> {
        let rows: Vec<TableRow> = batch
            .into_records()?
            .into_iter()
            .map(|record| TableRow {
                row_id: record.id,
                body_blob: record.document,
                vector: record.vector,
                metadata: record.metadata.unwrap_or_default(),
            })
            .collect();

        let ttl = self.config.ttl();
        let batches = into_chunks(rows, BATCH_SIZE);
        let batch_count = batches.len();
        let mut report = InsertReport::new();
        let mut batches = batches.into_iter().enumerate();

        for (index, batch) in batches.by_ref() {
            let writes = batch.into_iter().map(|row| {
                let id = row.row_id.clone();
                let put = self.table.put(&self.table_ref, row, ttl);
                async move { (id, put.await) }
            });

            let mut failed = false;
            for (id, outcome) in join_all(writes).await {
                match outcome {
                    Ok(()) => report.record_inserted([id]),
                    Err(error) => {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            table = %self.table_ref,
                            id = %id,
                            error = %error,
                            "Row write failed"
                        );
                        report.record_failure(vec![id], error);
                        failed = true;
                    }
                }
            }

            tracing::debug!(
                target: TRACING_TARGET,
                table = %self.table_ref,
                batch = index,
                batches = batch_count,
                "Batch written"
            );

            if failed {
                break;
            }
        }

        let skipped: Vec<String> = batches
            .flat_map(|(_, rest)| rest.into_iter().map(|row| row.row_id))
            .collect();
        if !skipped.is_empty() {
            tracing::warn!(
                target: TRACING_TARGET,
                table = %self.table_ref,
                skipped = skipped.len(),
                "Stopped loading after a failed batch"
            );
            report.record_skipped(skipped);
        }

        Ok(report)
    }

    async fn search_embedding(
        &self,
        query: &[f32],
        k: usize,
        filters: Option<&Metadata>,
    ) -> VectorResult<SearchResult> {
        if k == 0 {
            return Ok(SearchResult::empty());
        }

        let empty = Metadata::new();
        let filters = filters.unwrap_or(&empty);

        let hits = self
            .table
            .metric_ann_search(&self.table_ref, query, k, self.config.metric, filters)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            table = %self.table_ref,
            k,
            found = hits.len(),
            "Searched table"
        );

        Ok(hits.into_iter().map(Self::to_hit).collect())
    }
}
