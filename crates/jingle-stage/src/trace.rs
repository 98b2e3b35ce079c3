//! StageTrace — A sequence of stage events for one session
//!
//! A trace captures the full timeline of a play session so tools can query it
//! after the fact.

use serde::{Deserialize, Serialize};

use crate::event::StageEvent;
use crate::stage::{Stage, StageCategory};

/// A recorded trace of stage events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Optional session identifier
    #[serde(default)]
    pub session_id: Option<String>,

    /// All events in chronological order
    pub events: Vec<StageEvent>,
}

impl StageTrace {
    /// Create a new empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Set session ID
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    /// Append a batch of events
    pub fn extend(&mut self, events: impl IntoIterator<Item = StageEvent>) {
        self.events.extend(events);
    }

    /// Get total duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        }
    }

    /// Get events by category
    pub fn events_by_category(&self, category: StageCategory) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.category() == category)
            .collect()
    }

    /// Get events by stage type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    /// Count events of one type
    pub fn count(&self, type_name: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .count()
    }

    /// Check if trace contains a specific stage type
    pub fn has_stage(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.stage.type_name() == type_name)
    }

    /// Get all reel stop events
    pub fn reel_stops(&self) -> Vec<&StageEvent> {
        self.events_by_type("reel_stop")
    }

    /// Events belonging to one spin
    pub fn spin(&self, spin_seq: u64) -> Vec<&StageEvent> {
        self.events.iter().filter(|e| e.spin_seq == spin_seq).collect()
    }

    /// Sum of presented tickets across the trace
    pub fn total_tickets_presented(&self) -> u64 {
        self.events
            .iter()
            .filter_map(|e| match &e.stage {
                Stage::WinPresent { total_tickets, .. } => Some(*total_tickets),
                _ => None,
            })
            .sum()
    }

    /// Reel stops must arrive in increasing reel order within each spin
    pub fn reel_stops_ordered(&self) -> bool {
        let mut last: Option<(u64, u8)> = None;
        for event in &self.events {
            if let Stage::ReelStop { reel_index, .. } = event.stage {
                if let Some((seq, reel)) = last {
                    if seq == event.spin_seq && reel_index <= reel {
                        return false;
                    }
                }
                last = Some((event.spin_seq, reel_index));
            }
        }
        true
    }
}
