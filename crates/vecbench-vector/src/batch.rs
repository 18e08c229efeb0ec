//! Chunked, bounded-concurrency bulk writes.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use futures::StreamExt;
use futures::stream;
use vecbench_data::{InsertReport, UpsertOutcome, VectorError, VectorResult};

use crate::TRACING_TARGET;

/// Splits `items` into owned chunks of at most `size` elements.
pub(crate) fn into_chunks<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        chunks.push(items.by_ref().take(size).collect());
    }
    chunks
}

/// Writes `items` in chunks of `chunk_size`, keeping up to `concurrency`
/// chunk writes in flight.
///
/// A failing chunk does not stop its siblings. `write` returns the stored ids
/// and the per-document rejections of its chunk; a rejected id is reported
/// with its own error, and any submitted id the backend neither stored nor
/// rejected is reported as unacknowledged.
pub(crate) async fn insert_chunked<T, F, Fut>(
    items: Vec<(String, T)>,
    chunk_size: usize,
    concurrency: usize,
    write: F,
) -> InsertReport
where
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = VectorResult<UpsertOutcome>>,
{
    let chunks = into_chunks(items, chunk_size);
    let chunk_count = chunks.len();

    let writes = chunks.into_iter().enumerate().map(|(index, chunk)| {
        let (ids, payload): (Vec<String>, Vec<T>) = chunk.into_iter().unzip();
        let pending = write(payload);
        async move { (index, ids, pending.await) }
    });

    let outcomes: Vec<_> = stream::iter(writes)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = InsertReport::new();
    for (index, ids, outcome) in outcomes {
        match outcome {
            Ok(UpsertOutcome { stored, rejected }) => {
                let stored: HashSet<String> = stored.into_iter().collect();
                let mut rejected: HashMap<String, VectorError> = rejected.into_iter().collect();
                let mut written = Vec::with_capacity(ids.len());
                let mut missing = Vec::new();
                let mut refused = Vec::new();
                for id in ids {
                    if stored.contains(&id) {
                        written.push(id);
                    } else if let Some(error) = rejected.remove(&id) {
                        refused.push((id, error));
                    } else {
                        missing.push(id);
                    }
                }

                tracing::debug!(
                    target: TRACING_TARGET,
                    chunk = index,
                    chunks = chunk_count,
                    written = written.len(),
                    rejected = refused.len(),
                    "Chunk written"
                );

                report.record_inserted(written);
                for (id, error) in refused {
                    report.record_failure(vec![id], error);
                }
                if !missing.is_empty() {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        chunk = index,
                        missing = missing.len(),
                        "Backend did not acknowledge every document of the chunk"
                    );
                    report.record_failure(
                        missing,
                        VectorError::backend("write not acknowledged by the backend"),
                    );
                }
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    chunk = index,
                    chunks = chunk_count,
                    count = ids.len(),
                    error = %error,
                    "Chunk write failed"
                );
                report.record_failure(ids, error);
            }
        }
    }

    report
}
