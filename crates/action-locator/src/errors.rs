//! Error types for locator system

use sheetform_core_types::LocatorKind;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// No element matched after every attempt
    #[error("Element not found: {kind} locator '{locator}' after {attempts} attempt(s)")]
    NotFound {
        locator: String,
        kind: LocatorKind,
        attempts: u32,
    },

    /// Locator string was blank
    #[error("Empty locator")]
    EmptyLocator,

    /// Page access failed on the final attempt, or in a way retrying cannot fix
    #[error("DOM error: {0}")]
    Dom(String),
}
