//! StageEvent — A stage occurrence with metadata
//!
//! Wraps a Stage with its virtual timestamp and the spin it belongs to.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event with full metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Session clock in milliseconds
    pub timestamp_ms: u64,

    /// Spin sequence number the stage belongs to (0 = between spins)
    #[serde(default)]
    pub spin_seq: u64,

    /// Custom tags for filtering/routing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StageEvent {
    /// Create a new stage event
    pub fn new(stage: Stage, timestamp_ms: u64, spin_seq: u64) -> Self {
        Self {
            stage,
            timestamp_ms,
            spin_seq,
            tags: Vec::new(),
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }

    /// Check for a tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags() {
        let event = StageEvent::new(Stage::EvaluateWins, 3_500, 7).with_tag("bonus");
        assert_eq!(event.type_name(), "evaluate_wins");
        assert!(event.has_tag("bonus"));
        assert!(!event.has_tag("manual"));
    }
}
