pub mod app;
pub mod check;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod fill;
pub mod output;
pub mod runtime;

pub use app::run;
pub use check::{cmd_check, CheckArgs};
pub use fill::{cmd_fill, FillArgs};
