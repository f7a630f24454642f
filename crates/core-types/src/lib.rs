//! Shared data model for the SheetForm engine crates.
//!
//! Field instructions come in as [`FieldDescriptor`] rows; the keyword enums in
//! [`keywords`] give them closed, typed meaning; a run reports back through
//! [`RunResult`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod field;
pub mod keywords;
pub mod result;

pub use field::*;
pub use keywords::*;
pub use result::*;

/// Correlation id for one orchestration pass.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
