// server/src/cli/mod.rs

pub mod commands;
pub mod handlers;

pub use commands::{CliArgs, ClinicCommands};
pub use handlers::{run, start_cli};
