use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    /// `application/json` forces strict-JSON output.
    pub response_mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        if content.parts.is_empty() {
            return None;
        }
        Some(
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(""),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRequest {
    pub model: String,
    pub content: Content,
    pub task_type: String,
    pub output_dimensionality: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedValues {
    #[serde(default)]
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedResponse {
    pub embedding: EmbedValues,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn generation_config_serializes_camel_case() {
        let config = GenerationConfig {
            temperature: 0.2,
            response_mime_type: "application/json".into(),
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["responseMimeType"], "application/json");
    }
}
