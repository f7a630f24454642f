//! Error types for event synthesis

use dom_adapter::DomError;
use thiserror::Error;

/// Synthesis error enumeration
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The page rejected an operation mid-sequence
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}
