mod error;
mod store;
mod types;

pub use error::VectorError;
pub use store::VectorStore;
pub use types::{MatchRow, NewDocument};
