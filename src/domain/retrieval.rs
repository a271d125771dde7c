use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One chunk returned by the vector store.
///
/// Identity for deduplication is `chunk_text`; when the same chunk surfaces
/// through several searches the highest similarity wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk_text: String,
    /// Cosine similarity in `[0, 1]`.
    pub similarity: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
}

/// Decomposed search intent produced from a compound user query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalIntent {
    /// Concrete targets: named landmarks, numeric ids, color+shape pairs.
    pub targets: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    pub original_query: String,
}

/// Caller-supplied retrieval knobs; every field has a skill-level default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

impl RetrievalFilters {
    pub const DEFAULT_TOP_K: usize = 5;
    pub const DEFAULT_THRESHOLD: f32 = 0.5;
    /// Broadened threshold used by targeted re-retrieval.
    pub const MISSING_THRESHOLD: f32 = 0.4;

    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(Self::DEFAULT_TOP_K)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold.unwrap_or(Self::DEFAULT_THRESHOLD)
    }
}

/// Result payload shared by all retriever skills.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub hits: Vec<RetrievalHit>,
    pub total_found: usize,
    pub duration_ms: u64,
    /// Hits per decomposed target, so the orchestrator can see which
    /// targets came back empty. Present for `smart_retrieve` only.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub target_hits: HashMap<String, Vec<RetrievalHit>>,
    /// Intent decomposition behind `target_hits`, when one was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<RetrievalIntent>,
}

/// Merge raw hits, deduplicating by chunk text and keeping the best score.
pub fn merge_hits(batches: impl IntoIterator<Item = Vec<RetrievalHit>>) -> Vec<RetrievalHit> {
    let mut merged: Vec<RetrievalHit> = Vec::new();
    for hit in batches.into_iter().flatten() {
        match merged.iter_mut().find(|h| h.chunk_text == hit.chunk_text) {
            Some(existing) => {
                if hit.similarity > existing.similarity {
                    existing.similarity = hit.similarity;
                }
            }
            None => merged.push(hit),
        }
    }
    merged
}

/// Threshold-filter, sort by score descending (stable), cut to `top_k`.
pub fn post_process(mut hits: Vec<RetrievalHit>, threshold: f32, top_k: usize) -> Vec<RetrievalHit> {
    hits.retain(|h| h.similarity >= threshold);
    hits.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, similarity: f32) -> RetrievalHit {
        RetrievalHit {
            chunk_text: text.to_string(),
            similarity,
            map_id: None,
        }
    }

    #[test]
    fn merge_keeps_highest_score_per_chunk() {
        let merged = merge_hits([
            vec![hit("a", 0.6), hit("b", 0.7)],
            vec![hit("a", 0.9), hit("c", 0.5)],
        ]);
        assert_eq!(merged.len(), 3);
        let a = merged.iter().find(|h| h.chunk_text == "a").unwrap();
        assert_eq!(a.similarity, 0.9);
    }

    #[test]
    fn post_process_filters_sorts_truncates() {
        let hits = vec![hit("low", 0.2), hit("mid", 0.6), hit("high", 0.9), hit("ok", 0.55)];
        let out = post_process(hits, 0.5, 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk_text, "high");
        assert_eq!(out[1].chunk_text, "mid");
    }

    #[test]
    fn post_process_is_order_stable_on_ties() {
        let hits = vec![hit("first", 0.8), hit("second", 0.8), hit("third", 0.8)];
        let out = post_process(hits, 0.5, 3);
        let names: Vec<_> = out.iter().map(|h| h.chunk_text.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn filters_fall_back_to_defaults() {
        let filters = RetrievalFilters::default();
        assert_eq!(filters.top_k(), 5);
        assert_eq!(filters.threshold(), 0.5);
    }
}
