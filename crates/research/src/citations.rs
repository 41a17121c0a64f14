//! Resolve `[[art_...]]` markers in answer text against the selection.

use crate::types::{Chunk, Citation};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static CITATION_MARKER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[\[(art_[a-zA-Z0-9]+)\]\]").ok());

/// Distinct article ids referenced by the answer, in order of first mention.
pub fn referenced_article_ids(answer: &str) -> Vec<&str> {
    let Some(marker) = CITATION_MARKER.as_ref() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    marker
        .captures_iter(answer)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// One citation per distinct referenced article that appears in `selection`.
///
/// Markers naming articles outside the selection are dropped. When several
/// selected chunks share an article id, the first in selection order supplies
/// the citation fields.
pub fn link_citations(answer: &str, selection: &[Chunk]) -> Vec<Citation> {
    let mut by_article: HashMap<&str, &Chunk> = HashMap::new();
    for chunk in selection {
        by_article.entry(chunk.article_id.as_str()).or_insert(chunk);
    }

    let referenced = referenced_article_ids(answer);
    let citations: Vec<Citation> = referenced
        .iter()
        .filter_map(|id| by_article.get(id))
        .map(|chunk| Citation::from(*chunk))
        .collect();

    if citations.len() < referenced.len() {
        tracing::debug!(
            referenced = referenced.len(),
            resolved = citations.len(),
            "Dropped citation markers with no matching article"
        );
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::chunk;

    #[test]
    fn test_resolves_markers_in_mention_order() {
        let selection = vec![chunk("c1", "art_one", 0.9), chunk("c2", "art_two", 0.8)];
        let answer = "Rates rose [[art_two]]. Markets fell [[art_one]]. Again [[art_two]].";

        let citations = link_citations(answer, &selection);
        let ids: Vec<_> = citations.iter().map(|c| c.article_id.as_str()).collect();
        assert_eq!(ids, vec!["art_two", "art_one"]);
        assert_eq!(citations[0].url, "https://example.com/art_two");
    }

    #[test]
    fn test_drops_unknown_articles() {
        let selection = vec![chunk("c1", "art_one", 0.9)];
        let answer = "Claim [[art_one]] and invented [[art_ghost]].";

        let citations = link_citations(answer, &selection);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].article_id, "art_one");
    }

    #[test]
    fn test_ignores_malformed_markers() {
        let selection = vec![chunk("c1", "art_one", 0.9)];
        for answer in ["[art_one]", "[[ art_one ]]", "[[article_one]]", "[[art_]]", "no markers"] {
            assert!(link_citations(answer, &selection).is_empty(), "{}", answer);
        }
    }

    #[test]
    fn test_first_chunk_of_article_wins() {
        let mut best = chunk("c1", "art_one", 0.9);
        best.title = "Best".to_string();
        let mut other = chunk("c2", "art_one", 0.7);
        other.title = "Other".to_string();

        let citations = link_citations("See [[art_one]]", &[best, other]);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].title, "Best");
    }

    #[test]
    fn test_empty_selection_yields_nothing() {
        assert!(link_citations("See [[art_one]]", &[]).is_empty());
    }

    #[test]
    fn test_referenced_ids_are_distinct() {
        let ids = referenced_article_ids("[[art_a1]] [[art_b2]] [[art_a1]]");
        assert_eq!(ids, vec!["art_a1", "art_b2"]);
    }
}
