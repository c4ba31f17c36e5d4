//! Command handlers for CLI subcommands

mod check;
mod completions;
mod execute;
mod serve;
mod utils;

pub use check::handle_check;
pub use completions::handle_completions;
pub use execute::handle_execute;
pub use serve::handle_serve;
