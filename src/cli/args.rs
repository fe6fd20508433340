//! CLI argument definitions.

use clap::Parser;

/// Provision a workstation to run the application, without root.
///
/// Installs the package manager, the pinned runtime and its package
/// installer, fetches the application into the project directory and
/// writes a launcher into the personal binary directory. Every install
/// asks for confirmation unless --yes is given.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "groundwork")]
#[command(about, long_about)]
#[command(after_help = "Environment:\n  \
    PROJECT_DIR        Provision into this directory instead of the configured one\n  \
    GROUNDWORK_CONFIG  YAML file whose keys override the built-in defaults\n  \
    RUST_LOG           Diagnostic log filter (default: groundwork=warn)")]
pub struct Cli {
    /// Approve every step without prompting
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}
