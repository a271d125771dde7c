mod intent;
mod variations;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::a2a::{skill_handler, A2aError, A2aServer, AgentCard};
use crate::domain::retrieval::{merge_hits, post_process};
use crate::domain::{RetrievalFilters, RetrievalHit, RetrievalIntent, RetrievalOutcome};
use crate::services::gemini::GeminiClient;
use crate::services::vector::{VectorError, VectorStore};

/// Over-fetch margin so threshold filtering still leaves `top_k` hits.
const OVERFETCH: usize = 3;
/// Per-target searches stay narrow.
const TARGET_TOP_K: usize = 3;

#[derive(Debug, Deserialize)]
struct QueryInput {
    query: String,
    #[serde(default)]
    filters: RetrievalFilters,
}

#[derive(Debug, Deserialize)]
struct MissingInput {
    #[serde(default)]
    missing_targets: Vec<String>,
    #[serde(default)]
    filters: RetrievalFilters,
}

/// Retriever agent: owns the embedding handle and the vector store handle.
pub struct RetrieverAgent {
    gemini: GeminiClient,
    store: VectorStore,
}

impl RetrieverAgent {
    pub fn new(gemini: GeminiClient, store: VectorStore) -> Self {
        Self { gemini, store }
    }

    async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
        map_id: Option<&str>,
    ) -> Result<Vec<RetrievalHit>, VectorError> {
        let embedding = self
            .gemini
            .embed(query)
            .await
            .map_err(|e| VectorError::Http(e.to_string()))?;
        let rows = self
            .store
            .match_documents(&embedding, top_k + OVERFETCH, map_id, threshold)
            .await?;
        Ok(rows.into_iter().map(RetrievalHit::from).collect())
    }

    /// Direct vector retrieval: embed, search, filter, sort, truncate.
    #[instrument(level = "info", skip(self, filters))]
    pub async fn retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
    ) -> Result<RetrievalOutcome, VectorError> {
        let started = Instant::now();
        let raw = self
            .search(query, filters.top_k(), filters.threshold(), filters.map_id.as_deref())
            .await?;
        let mut hits = post_process(raw, filters.threshold(), usize::MAX);
        let total_found = hits.len();
        hits.truncate(filters.top_k());
        Ok(RetrievalOutcome {
            hits,
            total_found,
            duration_ms: started.elapsed().as_millis() as u64,
            target_hits: HashMap::new(),
            intent: None,
        })
    }

    /// Intent-decomposing retrieval: search each extracted target plus the
    /// original query, merge with chunk-text dedup, and keep the per-target
    /// map so the caller can see which targets came back empty.
    #[instrument(level = "info", skip(self, filters))]
    pub async fn smart_retrieve(
        &self,
        query: &str,
        filters: &RetrievalFilters,
    ) -> Result<RetrievalOutcome, VectorError> {
        let started = Instant::now();
        let threshold = filters.threshold();
        let map_id = filters.map_id.as_deref();

        // Decomposition failure degrades to plain retrieval on the query.
        let intent = match intent::decompose(&self.gemini, query).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, "intent decomposition failed, falling back to the raw query");
                RetrievalIntent {
                    targets: Vec::new(),
                    reasoning: String::new(),
                    original_query: query.to_string(),
                }
            }
        };

        let mut target_hits: HashMap<String, Vec<RetrievalHit>> = HashMap::new();
        let mut batches: Vec<Vec<RetrievalHit>> = Vec::new();
        for target in &intent.targets {
            match self.search(target, TARGET_TOP_K, threshold, map_id).await {
                Ok(raw) => {
                    let hits = post_process(raw, threshold, TARGET_TOP_K);
                    if hits.is_empty() {
                        debug!(rag_target = %target, "target produced zero hits");
                    }
                    target_hits.insert(target.clone(), hits.clone());
                    batches.push(hits);
                }
                Err(e) => {
                    warn!(rag_target = %target, error = %e, "target search failed");
                    target_hits.insert(target.clone(), Vec::new());
                }
            }
        }

        // Fallback search on the original phrasing catches what the
        // decomposition missed.
        match self.search(query, filters.top_k(), threshold, map_id).await {
            Ok(raw) => batches.push(raw),
            Err(e) if batches.is_empty() => return Err(e),
            Err(e) => warn!(error = %e, "fallback search failed"),
        }

        let merged = merge_hits(batches);
        let mut hits = post_process(merged, threshold, usize::MAX);
        let total_found = hits.len();
        hits.truncate(filters.top_k());

        Ok(RetrievalOutcome {
            hits,
            total_found,
            duration_ms: started.elapsed().as_millis() as u64,
            target_hits,
            intent: Some(intent),
        })
    }

    /// Targeted re-retrieval for the planner's `missing_locations` feedback:
    /// try broadened variations per target at a lowered threshold and keep
    /// the best-scoring variation.
    #[instrument(level = "info", skip(self, filters), fields(targets = missing_targets.len()))]
    pub async fn retrieve_missing(
        &self,
        missing_targets: &[String],
        filters: &RetrievalFilters,
    ) -> Result<RetrievalOutcome, VectorError> {
        let started = Instant::now();
        let threshold = filters
            .threshold
            .unwrap_or(RetrievalFilters::MISSING_THRESHOLD);
        let map_id = filters.map_id.as_deref();

        let mut target_hits: HashMap<String, Vec<RetrievalHit>> = HashMap::new();
        let mut batches: Vec<Vec<RetrievalHit>> = Vec::new();

        for target in missing_targets {
            let mut best: Vec<RetrievalHit> = Vec::new();
            let mut best_score = f32::MIN;
            for variation in variations::expand(target) {
                let raw = match self.search(&variation, TARGET_TOP_K, threshold, map_id).await {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(rag_target = %target, variation = %variation, error = %e, "variation search failed");
                        continue;
                    }
                };
                let hits = post_process(raw, threshold, TARGET_TOP_K);
                let top = hits.first().map(|h| h.similarity).unwrap_or(f32::MIN);
                if top > best_score {
                    best_score = top;
                    best = hits;
                }
            }
            debug!(rag_target = %target, found = best.len(), "best variation kept");
            target_hits.insert(target.clone(), best.clone());
            batches.push(best);
        }

        let merged = merge_hits(batches);
        let mut hits = post_process(merged, threshold, usize::MAX);
        let total_found = hits.len();
        hits.truncate(filters.top_k());

        Ok(RetrievalOutcome {
            hits,
            total_found,
            duration_ms: started.elapsed().as_millis() as u64,
            target_hits,
            intent: None,
        })
    }

    pub fn card(url: &str) -> AgentCard {
        let query_schema = json!({"type": "object", "properties": {
            "query": {"type": "string"},
            "filters": {"type": "object"}
        }, "required": ["query"]});
        let outcome_schema = json!({"type": "object", "properties": {
            "hits": {"type": "array"},
            "total_found": {"type": "integer"},
            "duration_ms": {"type": "integer"},
            "target_hits": {"type": "object"}
        }});

        AgentCard::new("retriever", url)
            .with_skill(
                "retrieve",
                "Direct vector retrieval over the map knowledge store",
                query_schema.clone(),
                outcome_schema.clone(),
            )
            .with_skill(
                "smart_retrieve",
                "Intent-decomposing retrieval with per-target result map",
                query_schema,
                outcome_schema.clone(),
            )
            .with_skill(
                "retrieve_missing",
                "Re-retrieve missing targets with broadened variations and a lower threshold",
                json!({"type": "object", "properties": {
                    "missing_targets": {"type": "array", "items": {"type": "string"}},
                    "filters": {"type": "object"}
                }, "required": ["missing_targets"]}),
                outcome_schema,
            )
    }

    pub fn server(self: &Arc<Self>, url: &str) -> A2aServer {
        let retrieve_agent = self.clone();
        let smart_agent = self.clone();
        let missing_agent = self.clone();

        A2aServer::new(Self::card(url))
            .register(
                "retrieve",
                skill_handler(move |task| {
                    let agent = retrieve_agent.clone();
                    async move {
                        let input: QueryInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let outcome = agent
                            .retrieve(&input.query, &input.filters)
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(outcome).map_err(Into::into)
                    }
                }),
            )
            .register(
                "smart_retrieve",
                skill_handler(move |task| {
                    let agent = smart_agent.clone();
                    async move {
                        let input: QueryInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let outcome = agent
                            .smart_retrieve(&input.query, &input.filters)
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(outcome).map_err(Into::into)
                    }
                }),
            )
            .register(
                "retrieve_missing",
                skill_handler(move |task| {
                    let agent = missing_agent.clone();
                    async move {
                        let input: MissingInput = serde_json::from_value(task.input)
                            .map_err(|e| A2aError::InvalidInput(e.to_string()))?;
                        let outcome = agent
                            .retrieve_missing(&input.missing_targets, &input.filters)
                            .await
                            .map_err(|e| A2aError::Handler(e.to_string()))?;
                        serde_json::to_value(outcome).map_err(Into::into)
                    }
                }),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GeminiConfig, SupabaseConfig};

    fn agent() -> RetrieverAgent {
        RetrieverAgent::new(
            GeminiClient::new(&GeminiConfig {
                api_key: None,
                model: GeminiConfig::DEFAULT_MODEL.to_string(),
                embedding_model: GeminiConfig::DEFAULT_EMBEDDING_MODEL.to_string(),
            }),
            VectorStore::new(&SupabaseConfig {
                url: None,
                service_role_key: None,
            }),
        )
    }

    #[tokio::test]
    async fn retrieve_surfaces_store_failures() {
        let err = agent()
            .retrieve("fly to point 7", &RetrievalFilters::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TransportError"));
    }

    #[tokio::test]
    async fn retrieve_missing_returns_empty_map_entries_when_search_fails() {
        // Searches fail (nothing configured), so each target keeps an empty
        // best-variation entry rather than erroring the whole skill.
        let outcome = agent()
            .retrieve_missing(
                &["3号".to_string(), "6号".to_string()],
                &RetrievalFilters::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.hits.len(), 0);
        assert_eq!(outcome.target_hits.len(), 2);
        assert!(outcome.target_hits["3号"].is_empty());
    }

    #[test]
    fn missing_threshold_default_is_lower() {
        assert!(RetrievalFilters::MISSING_THRESHOLD < RetrievalFilters::DEFAULT_THRESHOLD);
    }
}
