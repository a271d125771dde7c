use serde::{Deserialize, Serialize};

use crate::domain::RetrievalHit;

/// One row returned by the `match_documents` stored procedure.
/// `similarity` is `1 - cosine_distance`, already threshold-filtered
/// server-side and ordered ascending by distance.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRow {
    pub id: String,
    pub chunk_text: String,
    #[serde(default)]
    pub map_id: Option<String>,
    pub similarity: f32,
}

impl From<MatchRow> for RetrievalHit {
    fn from(row: MatchRow) -> Self {
        RetrievalHit {
            chunk_text: row.chunk_text,
            similarity: row.similarity,
            map_id: row.map_id,
        }
    }
}

/// Row shape for insertion into the `documents` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    pub chunk_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_row_converts_to_hit() {
        let row: MatchRow = serde_json::from_str(
            r#"{"id": "550e8400-e29b-41d4-a716-446655440000", "chunk_text": "7号蓝色圆形", "map_id": "m1", "similarity": 0.83}"#,
        )
        .unwrap();
        let hit = RetrievalHit::from(row);
        assert_eq!(hit.chunk_text, "7号蓝色圆形");
        assert_eq!(hit.similarity, 0.83);
        assert_eq!(hit.map_id.as_deref(), Some("m1"));
    }
}
