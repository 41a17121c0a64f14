//! Deduplicated chunk collection keyed by chunk id.

use crate::types::Chunk;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Chunks gathered across retrieval branches, at most one per `chunk_id`.
///
/// When the same chunk arrives twice the higher score wins; on a tie the
/// chunk already held stays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkCollection {
    chunks: HashMap<String, Chunk>,
}

impl ChunkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Chunk> {
        self.chunks.get(chunk_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Insert one chunk. Returns true if it was stored.
    pub fn merge_chunk(&mut self, chunk: Chunk) -> bool {
        match self.chunks.entry(chunk.chunk_id.clone()) {
            Entry::Occupied(mut held) => {
                if rank_score(chunk.similarity_score) > rank_score(held.get().similarity_score) {
                    held.insert(chunk);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(chunk);
                true
            }
        }
    }

    /// Fold another collection into this one.
    pub fn merge(&mut self, other: ChunkCollection) {
        for chunk in other.chunks.into_values() {
            self.merge_chunk(chunk);
        }
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks.into_values().collect()
    }
}

impl FromIterator<Chunk> for ChunkCollection {
    fn from_iter<I: IntoIterator<Item = Chunk>>(iter: I) -> Self {
        let mut collection = ChunkCollection::new();
        for chunk in iter {
            collection.merge_chunk(chunk);
        }
        collection
    }
}

impl Extend<Chunk> for ChunkCollection {
    fn extend<I: IntoIterator<Item = Chunk>>(&mut self, iter: I) {
        for chunk in iter {
            self.merge_chunk(chunk);
        }
    }
}

/// NaN never outranks a real score.
fn rank_score(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn chunk(chunk_id: &str, article_id: &str, score: f32) -> Chunk {
        Chunk {
            content: format!("Body of {}", chunk_id),
            article_id: article_id.to_string(),
            chunk_id: chunk_id.to_string(),
            title: format!("Title of {}", article_id),
            description: String::new(),
            url: format!("https://example.com/{}", article_id),
            source: "Example Wire".to_string(),
            authors: vec!["Staff".to_string()],
            published_date: "2025-01-01".to_string(),
            similarity_score: score,
        }
    }

    #[test]
    fn test_keeps_highest_score() {
        let mut collection = ChunkCollection::new();
        assert!(collection.merge_chunk(chunk("c1", "art_a", 0.6)));
        assert!(collection.merge_chunk(chunk("c1", "art_a", 0.9)));
        assert!(!collection.merge_chunk(chunk("c1", "art_a", 0.7)));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("c1").unwrap().similarity_score, 0.9);
    }

    #[test]
    fn test_tie_keeps_first() {
        let mut first = chunk("c1", "art_a", 0.8);
        first.content = "first".to_string();
        let mut second = chunk("c1", "art_a", 0.8);
        second.content = "second".to_string();

        let collection: ChunkCollection = vec![first, second].into_iter().collect();
        assert_eq!(collection.get("c1").unwrap().content, "first");
    }

    #[test]
    fn test_nan_never_replaces() {
        let mut collection = ChunkCollection::new();
        collection.merge_chunk(chunk("c1", "art_a", f32::NAN));
        collection.merge_chunk(chunk("c1", "art_a", 0.2));
        assert_eq!(collection.get("c1").unwrap().similarity_score, 0.2);

        assert!(!collection.merge_chunk(chunk("c1", "art_a", f32::NAN)));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a: ChunkCollection = vec![chunk("c1", "art_a", 0.6), chunk("c2", "art_b", 0.9)]
            .into_iter()
            .collect();
        let b: ChunkCollection = vec![chunk("c1", "art_a", 0.8), chunk("c3", "art_c", 0.4)]
            .into_iter()
            .collect();

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);

        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 3);
        assert_eq!(ab.get("c1").unwrap().similarity_score, 0.8);
    }
}
