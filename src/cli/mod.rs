//! Command-line interface.

mod app;
mod args;
mod commands;
mod output;

pub use app::App;
pub use args::{Cli, Commands};
pub use commands::execute;
