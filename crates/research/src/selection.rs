//! Relevance filtering and top-k selection.

use crate::collection::ChunkCollection;
use crate::types::Chunk;
use newsdesk_core::PipelineConfig;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Which chunks are worth showing to the answer stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    /// Scores must be strictly above this
    pub threshold: f32,
    /// Upper bound on the selection size
    pub max_selected: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_selected: 5,
        }
    }
}

impl From<&PipelineConfig> for SelectionPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.relevance_threshold,
            max_selected: config.max_selected,
        }
    }
}

/// Ordering used for ranking: higher score first, then lower chunk id.
struct Ranked<'a>(&'a Chunk);

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .similarity_score
            .total_cmp(&other.0.similarity_score)
            .then_with(|| other.0.chunk_id.cmp(&self.0.chunk_id))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

/// Pick the best chunks above the threshold, best first.
///
/// Runs in O(n log k) with a min-heap of at most `max_selected` entries.
/// Chunks with a NaN score are never selected.
pub fn select(collection: &ChunkCollection, policy: &SelectionPolicy) -> Vec<Chunk> {
    if policy.max_selected == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<Reverse<Ranked<'_>>> =
        BinaryHeap::with_capacity(policy.max_selected + 1);

    for chunk in collection.iter() {
        if chunk.similarity_score.is_nan() || chunk.similarity_score <= policy.threshold {
            continue;
        }
        heap.push(Reverse(Ranked(chunk)));
        if heap.len() > policy.max_selected {
            heap.pop();
        }
    }

    // Ascending order of Reverse is descending rank
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(chunk))| chunk.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::chunk;

    fn ids(selection: &[Chunk]) -> Vec<&str> {
        selection.iter().map(|c| c.chunk_id.as_str()).collect()
    }

    #[test]
    fn test_top_five_above_threshold() {
        let collection: ChunkCollection = [0.95, 0.9, 0.85, 0.8, 0.75, 0.7, 0.65]
            .iter()
            .enumerate()
            .map(|(i, s)| chunk(&format!("c{}", i), &format!("art_{}", i), *s))
            .collect();

        let selection = select(&collection, &SelectionPolicy::default());
        assert_eq!(ids(&selection), vec!["c0", "c1", "c2", "c3", "c4"]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let collection: ChunkCollection = vec![
            chunk("c1", "art_a", 0.5),
            chunk("c2", "art_b", 0.500001),
            chunk("c3", "art_c", 0.2),
        ]
        .into_iter()
        .collect();

        let selection = select(&collection, &SelectionPolicy::default());
        assert_eq!(ids(&selection), vec!["c2"]);
    }

    #[test]
    fn test_all_below_threshold_is_empty() {
        let collection: ChunkCollection = vec![chunk("c1", "art_a", 0.49), chunk("c2", "art_b", 0.1)]
            .into_iter()
            .collect();
        assert!(select(&collection, &SelectionPolicy::default()).is_empty());
        assert!(select(&ChunkCollection::new(), &SelectionPolicy::default()).is_empty());
    }

    #[test]
    fn test_ties_break_on_chunk_id() {
        let collection: ChunkCollection = vec![
            chunk("c9", "art_a", 0.8),
            chunk("c3", "art_b", 0.8),
            chunk("c5", "art_c", 0.8),
        ]
        .into_iter()
        .collect();

        let policy = SelectionPolicy {
            threshold: 0.5,
            max_selected: 2,
        };
        assert_eq!(ids(&select(&collection, &policy)), vec!["c3", "c5"]);
    }

    #[test]
    fn test_nan_excluded() {
        let collection: ChunkCollection = vec![chunk("c1", "art_a", f32::NAN), chunk("c2", "art_b", 0.7)]
            .into_iter()
            .collect();
        assert_eq!(ids(&select(&collection, &SelectionPolicy::default())), vec!["c2"]);
    }

    #[test]
    fn test_custom_policy() {
        let collection: ChunkCollection = vec![
            chunk("c1", "art_a", 0.3),
            chunk("c2", "art_b", 0.25),
            chunk("c3", "art_c", 0.1),
        ]
        .into_iter()
        .collect();

        let policy = SelectionPolicy {
            threshold: 0.2,
            max_selected: 10,
        };
        assert_eq!(ids(&select(&collection, &policy)), vec!["c1", "c2"]);

        let none = SelectionPolicy {
            threshold: 0.0,
            max_selected: 0,
        };
        assert!(select(&collection, &none).is_empty());
    }
}
