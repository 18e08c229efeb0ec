//! In-memory document API.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use vecbench_data::{
    Document, DocumentApi, ID_FIELD, SIMILARITY_FIELD, SimilarityMetric, UpsertOutcome,
    VECTOR_FIELD, VectorError, VectorResult,
};

use super::{InFlight, WriteEvent, rank, score};

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    documents: Vec<Document>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Collection>,
    failing_ids: HashSet<String>,
    fail_deletes: bool,
    in_flight: InFlight,
    events: Vec<WriteEvent>,
    chunk_sizes: Vec<usize>,
}

/// In-memory document store implementing [`DocumentApi`].
///
/// Collections keep documents in insertion order; an upsert of an existing
/// `_id` replaces the document in place. Documents whose vector length differs
/// from the collection dimension are rejected one by one. Search ranks by cosine similarity
/// and adds a `$similarity` field, like the real store does on request.
#[derive(Debug, Clone, Default)]
pub struct MockDocumentApi {
    state: Arc<Mutex<State>>,
}

impl MockDocumentApi {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `upsert_many` call containing `id` fail as a whole.
    pub fn fail_writes_containing(&self, id: impl Into<String>) {
        self.lock().failing_ids.insert(id.into());
    }

    /// Makes every `delete_collection` call fail.
    pub fn fail_deletes(&self) {
        self.lock().fail_deletes = true;
    }

    /// Returns `true` if the collection exists.
    pub fn has_collection(&self, name: &str) -> bool {
        self.lock().collections.contains_key(name)
    }

    /// Returns the stored documents of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Returns the size of every `upsert_many` call, in call order.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.lock().chunk_sizes.clone()
    }

    /// Returns the largest number of `upsert_many` calls seen in flight at once.
    pub fn max_concurrent_writes(&self) -> usize {
        self.lock().in_flight.max
    }

    /// Returns the start/finish events of every write.
    pub fn write_events(&self) -> Vec<WriteEvent> {
        self.lock().events.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_upsert(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VectorResult<UpsertOutcome> {
        let mut state = self.lock();

        if let Some(id) = documents
            .iter()
            .filter_map(document_id)
            .find(|id| state.failing_ids.contains(id))
        {
            return Err(VectorError::backend_with_code(
                "SERVER_UNHANDLED_ERROR",
                format!("injected failure for document '{id}'"),
            ));
        }

        let target = state
            .collections
            .get_mut(collection)
            .ok_or_else(|| VectorError::collection_not_found(collection))?;

        let mut outcome = UpsertOutcome::default();
        for document in documents {
            let id = document_id(&document)
                .ok_or_else(|| VectorError::invalid_input("document without _id"))?;
            let len = document_vector(&document).map_or(0, |v| v.len());
            if len != target.dimension {
                outcome
                    .rejected
                    .push((id, VectorError::dimension_mismatch(target.dimension, len)));
                continue;
            }
            match target
                .documents
                .iter_mut()
                .find(|d| document_id(d).as_deref() == Some(id.as_str()))
            {
                Some(existing) => *existing = document,
                None => target.documents.push(document),
            }
            outcome.stored.push(id);
        }

        // A request in which nothing was stored fails as a whole.
        if outcome.stored.is_empty() && !outcome.rejected.is_empty() {
            return Err(outcome.rejected.swap_remove(0).1);
        }

        Ok(outcome)
    }
}

#[async_trait]
impl DocumentApi for MockDocumentApi {
    async fn create_collection(&self, name: &str, dimension: usize) -> VectorResult<()> {
        let mut state = self.lock();
        match state.collections.get(name) {
            Some(existing) if existing.dimension != dimension => {
                Err(VectorError::backend_with_code(
                    "EXISTING_COLLECTION_DIFFERENT_SETTINGS",
                    format!("collection '{name}' exists with another dimension"),
                ))
            }
            Some(_) => Ok(()),
            None => {
                state.collections.insert(
                    name.to_string(),
                    Collection {
                        dimension,
                        documents: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn delete_collection(&self, name: &str) -> VectorResult<()> {
        let mut state = self.lock();
        if state.fail_deletes {
            return Err(VectorError::connection("injected delete failure"));
        }
        state.collections.remove(name);
        Ok(())
    }

    async fn upsert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> VectorResult<UpsertOutcome> {
        let ids: Vec<String> = documents.iter().filter_map(document_id).collect();
        {
            let mut state = self.lock();
            state.in_flight.enter();
            state.chunk_sizes.push(documents.len());
            state.events.push(WriteEvent::Started(ids.clone()));
        }

        // Let sibling writes start before this one completes.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let result = self.apply_upsert(collection, documents);

        let mut state = self.lock();
        state.in_flight.leave();
        state.events.push(WriteEvent::Finished(ids));
        result
    }

    async fn vector_find(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<Document>,
    ) -> VectorResult<Vec<Document>> {
        let state = self.lock();
        let target = state
            .collections
            .get(collection)
            .ok_or_else(|| VectorError::collection_not_found(collection))?;

        if vector.len() != target.dimension {
            return Err(VectorError::dimension_mismatch(
                target.dimension,
                vector.len(),
            ));
        }

        let scored = target
            .documents
            .iter()
            .filter(|d| filter.as_ref().is_none_or(|f| matches_filter(d, f)))
            .map(|d| {
                let stored = document_vector(d).unwrap_or_default();
                (score(SimilarityMetric::Cosine, vector, &stored), d.clone())
            })
            .collect();

        let documents = rank(scored, limit)
            .into_iter()
            .map(|(similarity, mut document)| {
                document.insert(SIMILARITY_FIELD.to_string(), Value::from(similarity));
                document
            })
            .collect();

        Ok(documents)
    }
}

fn document_id(document: &Document) -> Option<String> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn document_vector(document: &Document) -> Option<Vec<f32>> {
    document.get(VECTOR_FIELD)?.as_array().map(|values| {
        values
            .iter()
            .filter_map(Value::as_f64)
            .map(|x| x as f32)
            .collect()
    })
}

/// Resolves a dotted path such as `metadata.key` inside a document.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = document.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, expected)| lookup(document, path) == Some(expected))
}
