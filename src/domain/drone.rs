use serde::{Deserialize, Serialize};

/// World-frame position. Convention: +X right, +Z down, +Y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Read-only snapshot reported by the drone endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DroneState {
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub queue_length: u32,
}

impl DroneState {
    /// One-line rendering used in planner prompts and the REPL status view.
    pub fn summary(&self) -> String {
        format!(
            "position=({:.2}, {:.2}, {:.2}) active={} queued={}",
            self.position.x, self.position.y, self.position.z, self.is_active, self.queue_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_state() {
        let state: DroneState = serde_json::from_str(r#"{"is_active": true}"#).unwrap();
        assert!(state.is_active);
        assert_eq!(state.queue_length, 0);
        assert_eq!(state.position, Position::default());
    }
}
