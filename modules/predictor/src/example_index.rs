use std::path::Path;

use fleetguard_entity::Platform;
use serde::{Deserialize, Serialize};

/// A labeled training example held in memory for Tier-2 nearest-neighbor
/// lookup (`spec.md` §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Example {
    pub external_id: String,
    pub summary: String,
    pub labels: Vec<String>,
    pub platform: Platform,
    pub embedding: Vec<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExampleIndexLoadError {
    #[error("reading example index file: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing example index file: {0}")]
    Json(#[from] serde_json::Error),
}

/// The top-k result of a similarity search: the matched example and its
/// cosine similarity to the query vector, in descending similarity order.
#[derive(Debug, Clone)]
pub struct Neighbor<'a> {
    pub example: &'a Example,
    pub similarity: f32,
}

/// In-memory nearest-neighbor index over [`Example`] embeddings
/// (`spec.md` §4.3, §5 "loaded once at startup, read-only thereafter").
///
/// A production index would delegate to a real ANN library (FAISS, HNSW);
/// this one does brute-force cosine similarity, which is adequate at the
/// scale of a per-platform taxonomy's training set and keeps the crate free
/// of a native-library dependency.
#[derive(Debug, Default)]
pub struct ExampleIndex {
    examples: Vec<Example>,
}

impl ExampleIndex {
    pub fn new(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    /// Loads the model artifact described in `spec.md` §6.3 ("ExampleIndex
    /// binary blob + its metadata, which are treated as read-only"). A JSON
    /// array of [`Example`] stands in for the binary blob here; the crate
    /// treats it the same way once loaded — read-only for the life of the
    /// process (§5 "loaded once at startup").
    pub fn load_json(path: &Path) -> Result<Self, ExampleIndexLoadError> {
        let bytes = std::fs::read(path)?;
        let examples: Vec<Example> = serde_json::from_slice(&bytes)?;
        Ok(Self::new(examples))
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Returns up to `k` nearest examples for `platform`, ordered by
    /// similarity descending. Examples for other platforms are excluded:
    /// labels are taxonomy-scoped per platform (§6.1).
    pub fn top_k(&self, query: &[f32], platform: Platform, k: usize) -> Vec<Neighbor<'_>> {
        let mut scored: Vec<Neighbor<'_>> = self
            .examples
            .iter()
            .filter(|e| e.platform == platform)
            .filter_map(|example| {
                cosine_similarity(query, &example.embedding).map(|similarity| Neighbor {
                    example,
                    similarity,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);
        scored
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(id: &str, embedding: Vec<f32>) -> Example {
        Example {
            external_id: id.to_string(),
            summary: "heap overflow in SNMP subsystem".to_string(),
            labels: vec!["snmp".to_string()],
            platform: Platform::IosXe,
            embedding,
        }
    }

    #[test]
    fn top_k_orders_by_similarity_descending() {
        let index = ExampleIndex::new(vec![
            example("a", vec![1.0, 0.0]),
            example("b", vec![0.0, 1.0]),
            example("c", vec![0.9, 0.1]),
        ]);

        let neighbors = index.top_k(&[1.0, 0.0], Platform::IosXe, 2);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].example.external_id, "a");
        assert_eq!(neighbors[1].example.external_id, "c");
    }

    #[test]
    fn filters_by_platform() {
        let mut other = example("d", vec![1.0, 0.0]);
        other.platform = Platform::Asa;
        let index = ExampleIndex::new(vec![other]);

        assert!(index.top_k(&[1.0, 0.0], Platform::IosXe, 5).is_empty());
    }

    #[test]
    fn mismatched_dimensions_are_skipped() {
        let index = ExampleIndex::new(vec![example("a", vec![1.0, 0.0, 0.0])]);
        assert!(index.top_k(&[1.0, 0.0], Platform::IosXe, 5).is_empty());
    }
}
