//! Field dispatch and run orchestration
//!
//! This crate ties the pieces together: the locator resolves each field's element, the
//! dispatcher prepares it and maps the action keyword onto the event synthesizer, and the
//! orchestrator walks the field list, paces it and tallies the result.

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod orchestrator;

pub use config::{EngineConfig, HighlightConfig, PrepareConfig};
pub use dispatcher::ActionDispatcher;
pub use errors::{ActionError, FieldError, FillError};
pub use orchestrator::{parse_field_list, Orchestrator, RunState};
