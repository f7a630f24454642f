//! Core data types for event synthesis

use serde::{Deserialize, Serialize};
use stealth::Intensity;

/// What a synthesizer was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    ApplyValue,
    Click,
    Clear,
}

impl Gesture {
    pub fn name(&self) -> &'static str {
        match self {
            Gesture::ApplyValue => "apply_value",
            Gesture::Click => "click",
            Gesture::Clear => "clear",
        }
    }
}

/// Outcome of one synthesized gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub gesture: Gesture,
    pub intensity: Intensity,
    /// Number of events dispatched on the element
    pub events: u32,
    /// Value read back after the gesture; `None` for clicks
    pub committed: Option<String>,
    pub latency_ms: u64,
}

impl SynthesisReport {
    /// True when the page kept `requested` (always true for clicks)
    pub fn value_matches(&self, requested: &str) -> bool {
        self.committed.as_deref().map_or(true, |v| v == requested)
    }
}
