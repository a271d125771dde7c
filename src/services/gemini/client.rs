use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use super::error::ModelError;
use super::types::{
    Content, EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, GenerationConfig,
};
use crate::config::GeminiConfig;
use crate::domain::json::extract_object;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Fixed across producer and consumer: the vector store column is
/// `vector(768)` and `match_documents` expects the same width.
pub const EMBEDDING_DIMENSIONS: usize = 768;

const TIMEOUT_SECS: u64 = 60;
const RETRY_ATTEMPTS: usize = 2;

/// Gemini REST client exposing the two capabilities the system consumes:
/// strict-JSON generation and query embedding.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    embedding_model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ModelError> {
        self.api_key.as_deref().ok_or(ModelError::MissingApiKey)
    }

    /// Ask the model for a strict JSON object.
    ///
    /// The request forces `application/json` output; the response is still
    /// defensively parsed (fence stripping, object extraction) before being
    /// handed to the caller.
    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    pub async fn generate_json(
        &self,
        system_instruction: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<Value, ModelError> {
        let key = self.api_key()?.to_string();
        let request = GenerateRequest {
            system_instruction: Some(Content::text(None, system_instruction)),
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature,
                response_mime_type: "application/json".to_string(),
            },
        };
        let url = format!("{API_BASE}/{}:generateContent", self.model);

        let response: GenerateResponse = self.post_with_retry(&url, &key, &request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| ModelError::InvalidJson("empty candidate".into()))?;
        debug!(bytes = text.len(), "model returned json payload");

        extract_object(&text).ok_or_else(|| {
            let preview: String = text.chars().take(200).collect();
            ModelError::InvalidJson(preview)
        })
    }

    /// Embed a retrieval query into the fixed 768-dim space.
    #[instrument(level = "debug", skip_all, fields(model = %self.embedding_model))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let key = self.api_key()?.to_string();
        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::text(None, text),
            task_type: "RETRIEVAL_QUERY".to_string(),
            output_dimensionality: EMBEDDING_DIMENSIONS,
        };
        let url = format!("{API_BASE}/{}:embedContent", self.embedding_model);

        let response: EmbedResponse = self.post_with_retry(&url, &key, &request).await?;
        let values = response.embedding.values;
        if values.len() != EMBEDDING_DIMENSIONS {
            return Err(ModelError::DimensionMismatch {
                expected: EMBEDDING_DIMENSIONS,
                got: values.len(),
            });
        }
        Ok(values)
    }

    async fn post_with_retry<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        key: &str,
        body: &B,
    ) -> Result<T, ModelError> {
        let mut last_error = None;
        for attempt in 0..=RETRY_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
            }
            match self
                .http
                .post(url)
                .header("x-goog-api-key", key)
                .json(body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<T>().await?);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    last_error = Some(ModelError::Api { status, body });
                }
                Err(e) => last_error = Some(e.into()),
            }
        }
        Err(last_error.unwrap_or(ModelError::Http("request never attempted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: Option<&str>) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: key.map(str::to_string),
            model: GeminiConfig::DEFAULT_MODEL.to_string(),
            embedding_model: GeminiConfig::DEFAULT_EMBEDDING_MODEL.to_string(),
        })
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_network() {
        let err = client(None).generate_json("sys", "prompt", 0.2).await.unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey));

        let err = client(None).embed("query").await.unwrap_err();
        assert!(matches!(err, ModelError::MissingApiKey));
    }

    #[test]
    fn embedding_width_is_locked_to_the_store() {
        assert_eq!(EMBEDDING_DIMENSIONS, 768);
    }
}
