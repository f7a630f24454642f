//! Event synthesis for form controls
//!
//! Turns "put this value into that element" into the sequence of DOM events a page's
//! listeners expect to see. Three intensities are supported:
//! - `Plain`: focus, replace the value, `input`/`change`, blur
//! - `Enhanced`: adds hover, `keyup` and `paste` with wider pacing
//! - `MaximumVariance`: commits the value, then a shuffled storm of event groups
//!
//! [`ScriptedSynthesizer`] is the deterministic minimum for tests and hosts that want it.

pub mod errors;
mod pacing;
mod scripted;
mod synthesizer;
pub mod types;

pub use errors::*;
pub use pacing::*;
pub use scripted::*;
pub use synthesizer::*;
pub use types::*;
