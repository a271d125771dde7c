use std::time::Duration;

use serde_json::json;
use tracing::{debug, instrument};

use super::error::VectorError;
use super::types::{MatchRow, NewDocument};
use crate::config::SupabaseConfig;

const TIMEOUT_SECS: u64 = 30;

/// Supabase PostgREST client for the `documents` table and its
/// `match_documents` similarity procedure.
#[derive(Clone)]
pub struct VectorStore {
    http: reqwest::Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl VectorStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: config.url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            service_key: config.service_role_key.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), VectorError> {
        match (self.base_url.as_deref(), self.service_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(VectorError::NotConfigured),
        }
    }

    /// Call `match_documents(query_embedding, match_count, filter_map_id,
    /// filter_tags, match_threshold)`.
    #[instrument(level = "debug", skip_all, fields(match_count, threshold))]
    pub async fn match_documents(
        &self,
        query_embedding: &[f32],
        match_count: usize,
        filter_map_id: Option<&str>,
        match_threshold: f32,
    ) -> Result<Vec<MatchRow>, VectorError> {
        let (base, key) = self.credentials()?;
        let url = format!("{base}/rest/v1/rpc/match_documents");
        let body = json!({
            "query_embedding": query_embedding,
            "match_count": match_count,
            "filter_map_id": filter_map_id,
            "filter_tags": serde_json::Value::Null,
            "match_threshold": match_threshold,
        });

        let response = self
            .http
            .post(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorError::Api { status, body });
        }
        let rows = response.json::<Vec<MatchRow>>().await?;
        debug!(rows = rows.len(), "match_documents returned");
        Ok(rows)
    }

    /// Insert one chunk row. Used by operators pre-loading maps; the
    /// runtime path is read-only.
    pub async fn insert_document(&self, document: &NewDocument) -> Result<(), VectorError> {
        let (base, key) = self.credentials()?;
        let url = format!("{base}/rest/v1/documents");
        let response = self
            .http
            .post(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
            .json(document)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VectorError::Api { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_store_fails_without_network() {
        let store = VectorStore::new(&SupabaseConfig {
            url: None,
            service_role_key: None,
        });
        let err = store.match_documents(&[0.0; 4], 5, None, 0.5).await.unwrap_err();
        assert!(matches!(err, VectorError::NotConfigured));
    }
}
