/// Failures talking to the vector store.
#[derive(Debug)]
pub enum VectorError {
    /// `SUPABASE_URL` / `SUPABASE_SERVICE_ROLE_KEY` missing; retrieval is degraded.
    NotConfigured,
    Http(String),
    Api { status: u16, body: String },
}

impl std::fmt::Display for VectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorError::NotConfigured => {
                write!(f, "TransportError: vector store is not configured")
            }
            VectorError::Http(msg) => write!(f, "TransportError: vector store http failure: {msg}"),
            VectorError::Api { status, body } => {
                write!(f, "TransportError: vector store api error {status}: {body}")
            }
        }
    }
}

impl std::error::Error for VectorError {}

impl From<reqwest::Error> for VectorError {
    fn from(err: reqwest::Error) -> Self {
        VectorError::Http(err.to_string())
    }
}
