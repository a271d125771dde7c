use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::RetrievalIntent;
use crate::services::gemini::{GeminiClient, ModelError};

const INTENT_TEMPERATURE: f32 = 0.1;

const INTENT_SYSTEM_PROMPT: &str = r#"You decompose a drone flight request into the concrete targets it refers to.

A target is anything the map knowledge could locate: a named landmark, a numeric point id ("7", "3号"), or a color+shape pair ("蓝色圆形", "red square"). Keep each target exactly as the user wrote it; do not translate or normalize. A request with no locatable targets gets an empty list.

Respond with ONLY a JSON object:
{"targets": ["7号", "蓝色方块"], "reasoning": "one short sentence"}"#;

/// Ask the model to extract every concrete target from a compound query.
#[instrument(level = "debug", skip(gemini))]
pub async fn decompose(
    gemini: &GeminiClient,
    query: &str,
) -> Result<RetrievalIntent, ModelError> {
    let raw = gemini
        .generate_json(INTENT_SYSTEM_PROMPT, query, INTENT_TEMPERATURE)
        .await?;

    let targets = match raw.get("targets") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    let reasoning = raw
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    debug!(targets = targets.len(), "intent decomposed");
    Ok(RetrievalIntent {
        targets,
        reasoning,
        original_query: query.to_string(),
    })
}
