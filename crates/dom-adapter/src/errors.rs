use thiserror::Error;

/// Failures surfaced by a [`crate::DomPort`] backend.
#[derive(Debug, Error)]
pub enum DomError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid xpath '{expression}': {reason}")]
    InvalidXPath { expression: String, reason: String },

    #[error("element handle {0} no longer refers to an element")]
    StaleElement(u64),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("page script failed: {0}")]
    Script(String),

    #[error("page not ready: {0}")]
    NotReady(String),

    #[error("browser transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DomError {
    pub fn invalid_selector(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_xpath(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidXPath {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Whether the same call could succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomError::StaleElement(_) | DomError::NotReady(_) | DomError::Transport(_)
        )
    }

    /// Query syntax problems; callers treat these as "no match".
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            DomError::InvalidSelector { .. } | DomError::InvalidXPath { .. }
        )
    }
}
