//! SheetForm command-line front end
//!
//! Exposes modules for integration testing

pub mod cli;
pub mod sheet;
