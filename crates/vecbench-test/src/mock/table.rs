//! In-memory vector table.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use vecbench_data::{
    Metadata, SimilarityMetric, TableHit, TableRef, TableRow, VectorError, VectorResult,
    VectorTable,
};

use super::{InFlight, WriteEvent, rank, score};

#[derive(Debug)]
struct StoredRow {
    row: TableRow,
    ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct Table {
    dimension: usize,
    rows: Vec<StoredRow>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableRef, Table>,
    failing_ids: HashSet<String>,
    fail_clears: bool,
    in_flight: InFlight,
    events: Vec<WriteEvent>,
}

/// In-memory vector table implementing [`VectorTable`].
///
/// Rows keep insertion order and are replaced in place on a repeated id.
/// TTLs are recorded but never expire rows.
#[derive(Debug, Clone, Default)]
pub struct MockVectorTable {
    state: Arc<Mutex<State>>,
}

impl MockVectorTable {
    /// Creates an empty table store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `put` of the row `id` fail.
    pub fn fail_writes_of(&self, id: impl Into<String>) {
        self.lock().failing_ids.insert(id.into());
    }

    /// Makes every `clear` call fail.
    pub fn fail_clears(&self) {
        self.lock().fail_clears = true;
    }

    /// Returns the rows of a table, in insertion order.
    pub fn rows(&self, table: &TableRef) -> Vec<TableRow> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.iter().map(|r| r.row.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the TTL a row was written with.
    pub fn ttl_of(&self, table: &TableRef, row_id: &str) -> Option<Duration> {
        self.lock()
            .tables
            .get(table)?
            .rows
            .iter()
            .find(|r| r.row.row_id == row_id)?
            .ttl
    }

    /// Returns the largest number of `put` calls seen in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.lock().in_flight.max
    }

    /// Returns the start/finish events of every `put`.
    pub fn write_events(&self) -> Vec<WriteEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_put(&self, table: &TableRef, row: TableRow, ttl: Option<Duration>) -> VectorResult<()> {
        let mut state = self.lock();

        if state.failing_ids.contains(&row.row_id) {
            return Err(VectorError::backend(format!(
                "injected failure for row '{}'",
                row.row_id
            )));
        }

        let target = state
            .tables
            .get_mut(table)
            .ok_or_else(|| VectorError::collection_not_found(table.to_string()))?;

        if row.vector.len() != target.dimension {
            return Err(VectorError::dimension_mismatch(
                target.dimension,
                row.vector.len(),
            ));
        }

        match target.rows.iter_mut().find(|r| r.row.row_id == row.row_id) {
            Some(existing) => *existing = StoredRow { row, ttl },
            None => target.rows.push(StoredRow { row, ttl }),
        }
        Ok(())
    }
}

#[async_trait]
impl VectorTable for MockVectorTable {
    async fn create_table(&self, table: &TableRef, dimension: usize) -> VectorResult<()> {
        self.lock()
            .tables
            .entry(table.clone())
            .or_insert_with(|| Table {
                dimension,
                rows: Vec::new(),
            });
        Ok(())
    }

    async fn clear(&self, table: &TableRef) -> VectorResult<()> {
        let mut state = self.lock();
        if state.fail_clears {
            return Err(VectorError::connection("injected clear failure"));
        }
        if let Some(target) = state.tables.get_mut(table) {
            target.rows.clear();
        }
        Ok(())
    }

    async fn put(
        &self,
        table: &TableRef,
        row: TableRow,
        ttl: Option<Duration>,
    ) -> VectorResult<()> {
        let id = vec![row.row_id.clone()];
        {
            let mut state = self.lock();
            state.in_flight.enter();
            state.events.push(WriteEvent::Started(id.clone()));
        }

        // Let sibling writes start before this one completes.
        tokio::task::yield_now().await;

        let result = self.apply_put(table, row, ttl);

        let mut state = self.lock();
        state.in_flight.leave();
        state.events.push(WriteEvent::Finished(id));
        result
    }

    async fn metric_ann_search(
        &self,
        table: &TableRef,
        vector: &[f32],
        n: usize,
        metric: SimilarityMetric,
        metadata: &Metadata,
    ) -> VectorResult<Vec<TableHit>> {
        let state = self.lock();
        let target = state
            .tables
            .get(table)
            .ok_or_else(|| VectorError::collection_not_found(table.to_string()))?;

        if vector.len() != target.dimension {
            return Err(VectorError::dimension_mismatch(
                target.dimension,
                vector.len(),
            ));
        }

        let scored = target
            .rows
            .iter()
            .filter(|r| {
                metadata
                    .iter()
                    .all(|(key, value)| r.row.metadata.get(key) == Some(value))
            })
            .map(|r| (score(metric, vector, &r.row.vector), r.row.clone()))
            .collect();

        let hits = rank(scored, n)
            .into_iter()
            .map(|(distance, row)| TableHit { row, distance })
            .collect();

        Ok(hits)
    }
}
