mod client;
mod error;
mod types;

pub use client::{GeminiClient, EMBEDDING_DIMENSIONS};
pub use error::ModelError;
