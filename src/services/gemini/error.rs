/// Failures talking to the language model.
#[derive(Debug)]
pub enum ModelError {
    /// No `GEMINI_API_KEY` configured; model-backed features are degraded.
    MissingApiKey,
    /// Request-level failure (connect, timeout, body read).
    Http(String),
    /// Non-success status from the API.
    Api { status: u16, body: String },
    /// The model produced output that is not the expected JSON object.
    InvalidJson(String),
    /// Embedding came back with the wrong dimensionality.
    DimensionMismatch { expected: usize, got: usize },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::MissingApiKey => write!(f, "ModelError: GEMINI_API_KEY is not configured"),
            ModelError::Http(msg) => write!(f, "ModelError: http failure: {msg}"),
            ModelError::Api { status, body } => {
                write!(f, "ModelError: api error {status}: {body}")
            }
            ModelError::InvalidJson(msg) => {
                write!(f, "ModelError: unparseable model output: {msg}")
            }
            ModelError::DimensionMismatch { expected, got } => {
                write!(f, "ModelError: embedding dimension mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        ModelError::Http(err.to_string())
    }
}
