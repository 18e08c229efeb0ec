//! Records, search results and insert reports shared by every backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{VectorError, VectorResult};

/// Metadata associated with a record, and the shape of equality filters.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A single embedding record, as handed to a backend adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Caller-supplied primary key.
    pub id: String,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Optional free-text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Optional metadata used for equality filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// The arguments of one `insert_embeddings` call.
///
/// `ids` and `embeddings` are parallel sequences. `documents` and `metadata`
/// are either absent for every record or present with one entry per id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    /// Record identifiers.
    pub ids: Vec<String>,
    /// One vector per id.
    pub embeddings: Vec<Vec<f32>>,
    /// Optional documents, one per id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<String>>,
    /// Optional metadata, one mapping per id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<Metadata>>,
}

impl EmbeddingBatch {
    /// Creates a batch from ids and their vectors.
    pub fn new(ids: Vec<String>, embeddings: Vec<Vec<f32>>) -> Self {
        Self {
            ids,
            embeddings,
            documents: None,
            metadata: None,
        }
    }

    /// Attaches one document per id.
    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Attaches one metadata mapping per id.
    pub fn with_metadata(mut self, metadata: Vec<Metadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the number of records in the batch.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Checks that every supplied sequence has one entry per id.
    pub fn validate(&self) -> VectorResult<()> {
        let expected = self.ids.len();
        let check = |name: &str, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(VectorError::invalid_input(format!(
                    "{name} has {actual} entries but {expected} ids were given"
                )))
            }
        };

        check("embeddings", self.embeddings.len())?;
        if let Some(documents) = &self.documents {
            check("documents", documents.len())?;
        }
        if let Some(metadata) = &self.metadata {
            check("metadata", metadata.len())?;
        }
        Ok(())
    }

    /// Validates the batch and splits it into index-aligned records.
    pub fn into_records(self) -> VectorResult<Vec<EmbeddingRecord>> {
        self.validate()?;

        let mut documents = self.documents.map(Vec::into_iter);
        let mut metadata = self.metadata.map(Vec::into_iter);

        let records = self
            .ids
            .into_iter()
            .zip(self.embeddings)
            .map(|(id, vector)| EmbeddingRecord {
                id,
                vector,
                document: documents.as_mut().and_then(Iterator::next),
                metadata: metadata.as_mut().and_then(Iterator::next),
            })
            .collect();

        Ok(records)
    }
}

/// One matched record of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Record id.
    pub id: String,
    /// The stored vector.
    pub embedding: Vec<f32>,
    /// The stored document, if any.
    pub document: Option<String>,
    /// The stored metadata, if any.
    pub metadata: Option<Metadata>,
    /// Similarity score, for backends that report one.
    pub similarity: Option<f32>,
}

/// Normalized record set returned by `search_embedding`.
///
/// Every sequence is index-aligned: position `i` of each describes the same
/// matched record, nearest first. Built by collecting [`SearchHit`] values;
/// `similarity` is present only if the result is non-empty and every hit
/// carries a score. Serialize-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    ids: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<Option<Metadata>>,
    documents: Vec<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<Vec<f32>>,
}

impl SearchResult {
    /// Returns an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Matched ids, nearest first.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Stored vectors of the matched records.
    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Stored documents; `None` where a record has none.
    pub fn documents(&self) -> &[Option<String>] {
        &self.documents
    }

    /// Stored metadata; `None` where a record has none.
    pub fn metadatas(&self) -> &[Option<Metadata>] {
        &self.metadatas
    }

    /// Similarity scores, for backends that report them.
    pub fn similarity(&self) -> Option<&[f32]> {
        self.similarity.as_deref()
    }

    /// Returns the number of matched records.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterates the matched records as hits.
    pub fn hits(&self) -> impl Iterator<Item = SearchHit> + '_ {
        (0..self.len()).map(|i| SearchHit {
            id: self.ids[i].clone(),
            embedding: self.embeddings[i].clone(),
            document: self.documents[i].clone(),
            metadata: self.metadatas[i].clone(),
            similarity: self.similarity.as_ref().map(|s| s[i]),
        })
    }
}

impl FromIterator<SearchHit> for SearchResult {
    fn from_iter<I: IntoIterator<Item = SearchHit>>(iter: I) -> Self {
        let mut result = Self::default();
        let mut scores = Vec::new();
        let mut scored = true;

        for hit in iter {
            match hit.similarity {
                Some(score) if scored => scores.push(score),
                _ => scored = false,
            }
            result.ids.push(hit.id);
            result.embeddings.push(hit.embedding);
            result.documents.push(hit.document);
            result.metadatas.push(hit.metadata);
        }

        if scored && !result.ids.is_empty() {
            result.similarity = Some(scores);
        }
        result
    }
}

/// A group of records whose write failed together.
#[derive(Debug)]
pub struct FailedWrite {
    /// Ids of the records that were not written.
    pub ids: Vec<String>,
    /// The error reported for them.
    pub error: VectorError,
}

/// Per-record outcome of an `insert_embeddings` call.
///
/// A bulk write is not atomic: some chunks may land while others fail. The
/// report names every id that was written, failed, or never attempted.
#[derive(Debug, Default)]
pub struct InsertReport {
    inserted: Vec<String>,
    failed: Vec<FailedWrite>,
    skipped: Vec<String>,
}

impl InsertReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records ids that were written.
    pub fn record_inserted(&mut self, ids: impl IntoIterator<Item = String>) {
        self.inserted.extend(ids);
    }

    /// Records ids whose write failed with `error`.
    pub fn record_failure(&mut self, ids: Vec<String>, error: VectorError) {
        self.failed.push(FailedWrite { ids, error });
    }

    /// Records ids that were never attempted.
    pub fn record_skipped(&mut self, ids: impl IntoIterator<Item = String>) {
        self.skipped.extend(ids);
    }

    /// Ids that were written.
    pub fn inserted(&self) -> &[String] {
        &self.inserted
    }

    /// Failed writes with their errors.
    pub fn failures(&self) -> &[FailedWrite] {
        &self.failed
    }

    /// Ids that were never attempted.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Ids whose write was attempted and failed.
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failed
            .iter()
            .flat_map(|f| f.ids.iter().map(String::as_str))
    }

    /// Number of ids that were not written, failed or skipped.
    pub fn unwritten_count(&self) -> usize {
        self.failed.iter().map(|f| f.ids.len()).sum::<usize>() + self.skipped.len()
    }

    /// Number of ids covered by this report.
    pub fn total(&self) -> usize {
        self.inserted.len() + self.unwritten_count()
    }

    /// Returns `true` if every submitted id was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// Converts an incomplete report into [`VectorError::PartialFailure`].
    pub fn into_result(self) -> VectorResult<Vec<String>> {
        if self.is_complete() {
            Ok(self.inserted)
        } else {
            Err(VectorError::partial_failure(
                self.unwritten_count(),
                self.total(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hit(id: &str, similarity: Option<f32>) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            embedding: vec![1.0, 2.0, 3.0],
            document: None,
            metadata: None,
            similarity,
        }
    }

    #[test]
    fn test_batch_rejects_length_mismatch() {
        let batch = EmbeddingBatch::new(vec!["a".into(), "b".into()], vec![vec![1.0]]);
        assert!(matches!(
            batch.validate(),
            Err(VectorError::InvalidInput(_))
        ));

        let batch = EmbeddingBatch::new(vec!["a".into()], vec![vec![1.0]])
            .with_documents(vec!["x".into(), "y".into()]);
        assert!(batch.into_records().is_err());
    }

    #[test]
    fn test_batch_into_records_keeps_absent_fields_absent() {
        let batch = EmbeddingBatch::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0], vec![2.0]],
        )
        .with_documents(vec!["first".into(), String::new()]);

        let records = batch.into_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].document.as_deref(), Some("first"));
        assert_eq!(records[1].document.as_deref(), Some(""));
        assert!(records.iter().all(|r| r.metadata.is_none()));
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let records = EmbeddingBatch::default().into_records().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_search_result_without_scores() {
        let result: SearchResult = vec![hit("a", None), hit("b", None)].into_iter().collect();
        assert_eq!(result.ids(), ["a", "b"]);
        assert_eq!(result.documents(), [None, None]);
        assert!(result.similarity().is_none());
    }

    #[test]
    fn test_search_result_with_scores() {
        let result: SearchResult = vec![hit("a", Some(0.9)), hit("b", Some(0.5))]
            .into_iter()
            .collect();
        assert_eq!(result.similarity(), Some(&[0.9, 0.5][..]));

        let hits: Vec<SearchHit> = result.hits().collect();
        assert_eq!(hits[1].similarity, Some(0.5));
    }

    #[test]
    fn test_search_result_drops_partial_scores() {
        let result: SearchResult = vec![hit("a", Some(0.9)), hit("b", None)]
            .into_iter()
            .collect();
        assert!(result.similarity().is_none());
    }

    #[test]
    fn test_empty_search_result_serializes_without_similarity() {
        let value = serde_json::to_value(SearchResult::empty()).unwrap();
        assert_eq!(
            value,
            json!({"ids": [], "embeddings": [], "metadatas": [], "documents": []})
        );
    }

    #[test]
    fn test_insert_report_partial_failure() {
        let mut report = InsertReport::new();
        report.record_inserted(vec!["a".to_string(), "b".to_string()]);
        report.record_failure(vec!["c".to_string()], VectorError::timeout("slow"));
        report.record_skipped(vec!["d".to_string()]);

        assert!(!report.is_complete());
        assert_eq!(report.total(), 4);
        assert_eq!(report.failed_ids().collect::<Vec<_>>(), ["c"]);
        assert!(matches!(
            report.into_result(),
            Err(VectorError::PartialFailure {
                failed: 2,
                total: 4
            })
        ));
    }

    #[test]
    fn test_insert_report_complete() {
        let mut report = InsertReport::new();
        report.record_inserted(vec!["a".to_string()]);
        assert_eq!(report.into_result().unwrap(), ["a"]);
    }
}
