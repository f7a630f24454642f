//! Dispatch and run error types

use action_locator::LocatorError;
use action_primitives::SynthesisError;
use dom_adapter::DomError;
use sheetform_core_types::FailureKind;
use thiserror::Error;

/// Per-field action errors
#[derive(Debug, Error)]
pub enum ActionError {
    /// Keyword does not apply to this element
    #[error("Unsupported action: {action} needs a checkbox or radio, found {element}")]
    UnsupportedAction {
        action: &'static str,
        element: String,
    },

    /// Literal values cannot be assigned to this element
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(String),

    /// Toggle had no effect (strict verification only)
    #[error("State not changed: {0}")]
    StateNotChanged(String),

    /// Page access failed during preparation or dispatch
    #[error("DOM error: {0}")]
    Dom(String),
}

impl ActionError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ActionError::UnsupportedAction { .. } => FailureKind::UnsupportedAction,
            ActionError::UnsupportedElementType(_) => FailureKind::UnsupportedElementType,
            ActionError::StateNotChanged(_) => FailureKind::StateNotChanged,
            ActionError::Dom(_) => FailureKind::Dom,
        }
    }
}

impl From<DomError> for ActionError {
    fn from(err: DomError) -> Self {
        ActionError::Dom(err.to_string())
    }
}

impl From<SynthesisError> for ActionError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Dom(dom) => ActionError::from(dom),
        }
    }
}

/// Anything that can fail a single field
#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Locate(#[from] LocatorError),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl FieldError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            FieldError::Locate(LocatorError::Dom(_)) => FailureKind::Dom,
            FieldError::Locate(_) => FailureKind::ElementNotFound,
            FieldError::Action(err) => err.failure_kind(),
        }
    }
}

/// Errors that end a fill request as a whole
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FillError {
    /// Another run owns this orchestrator
    #[error("A fill run is already in progress")]
    AlreadyInProgress,

    /// Input is not a sequence of field descriptors
    #[error("Malformed field list: {0}")]
    MalformedFieldList(String),
}
