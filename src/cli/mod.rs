//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod gc;
mod logging;
mod prompt;
mod version;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use gc::{Outcome, run_gc};
pub use logging::*;
pub use prompt::confirm;
pub use version::display_version;
