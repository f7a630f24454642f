//! Locator resolution - maps a (locator, kind) pair to a live element
//!
//! This crate implements element lookup for field instructions:
//! - One strategy function per locator kind, dispatched through a `match` table
//! - An ordered `auto` chain for kind-less locators
//! - A fixed-pause retry loop around every lookup

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
