//! Command-line interface.
//!
//! - [`args`] - argument definitions using clap derive macros
//! - [`provision`] - the provisioning run behind the single command

pub mod args;
pub mod provision;

pub use args::Cli;
pub use provision::{home_dir, ProvisionCommand};

use clap::error::ErrorKind;

/// Exit status for an argument error: 0 for help, 1 for anything else.
pub fn parse_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}
