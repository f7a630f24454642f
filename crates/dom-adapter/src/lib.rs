//! Page access for the SheetForm engine.
//!
//! Everything above this crate talks to a page through [`DomPort`]. Two backends ship here:
//! [`MemoryPage`], an HTML snapshot with mutable element state used by tests and the
//! offline CLI, and (behind the `chromium` feature) `ChromiumPage`, which drives a running
//! browser over the DevTools protocol.

pub mod errors;
pub mod memory;
pub mod ports;

#[cfg(feature = "chromium")]
pub mod chromium;

pub use errors::DomError;
pub use memory::{ControlState, MemoryPage};
pub use ports::{DomPort, ElementHandle, ElementInfo, EventKind, SyntheticEvent};

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumConfig, ChromiumPage};
