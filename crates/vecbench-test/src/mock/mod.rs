//! In-memory backends for testing.
//!
//! These mocks implement the capability traits from `vecbench-data` with the
//! observable behaviour of the real stores: nearest-first ranking, equality
//! filters, overwrite by id and rejection of mis-sized vectors.

mod document;
mod table;

pub use document::MockDocumentApi;
pub use table::MockVectorTable;
use vecbench_data::SimilarityMetric;

/// Start or end of a single write, in the order the mock observed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteEvent {
    /// A write carrying these ids started.
    Started(Vec<String>),
    /// A write carrying these ids returned.
    Finished(Vec<String>),
}

/// Tracks how many writes are in flight at once.
#[derive(Debug, Default)]
struct InFlight {
    current: usize,
    max: usize,
}

impl InFlight {
    fn enter(&mut self) {
        self.current += 1;
        self.max = self.max.max(self.current);
    }

    fn leave(&mut self) {
        self.current -= 1;
    }
}

/// Scores `candidate` against `query`; higher is nearer.
fn score(metric: SimilarityMetric, query: &[f32], candidate: &[f32]) -> f32 {
    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    match metric {
        SimilarityMetric::Cosine => {
            let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();
            let denom = norm(query) * norm(candidate);
            if denom == 0.0 { 0.0 } else { dot / denom }
        }
        SimilarityMetric::DotProduct => dot,
        SimilarityMetric::Euclidean => {
            let dist: f32 = query
                .iter()
                .zip(candidate)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt();
            1.0 / (1.0 + dist)
        }
    }
}

/// Sorts `(score, item)` pairs nearest first, keeping insertion order on ties.
fn rank<T>(mut scored: Vec<(f32, T)>, limit: usize) -> Vec<(f32, T)> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);
    scored
}
