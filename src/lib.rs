//! Groundwork - unprivileged workstation provisioning.
//!
//! Brings a machine from "nothing installed" to "application runnable from
//! the shell": a user-space package manager, a pinned runtime with its
//! package installer, the application's source tree and its dependencies,
//! and a launcher command on the operator's PATH. Every step checks whether
//! it is already satisfied first, so re-running converges.
//!
//! # Modules
//!
//! - [`acquire`] - Repository clone with archive fallback
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration defaults, overlay loading and path resolution
//! - [`error`] - Error types and result aliases
//! - [`fetch`] - HTTP downloads
//! - [`launcher`] - Launcher script and shell profile block
//! - [`requirements`] - Environment probe, confirmation gate and `ensure`
//! - [`runner`] - The provisioning state machine
//! - [`shell`] - External process execution and shell detection
//! - [`ui`] - Prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use groundwork::config::{default_config, ResolvedConfig};
//! use groundwork::requirements::probe::Arch;
//! use std::path::Path;
//!
//! let config = default_config().unwrap();
//! let resolved = ResolvedConfig::resolve(
//!     config,
//!     Path::new("/home/me"),
//!     Arch::from_name("aarch64"),
//!     Some("~/src/app".into()),
//! );
//! assert_eq!(resolved.destination, Path::new("/home/me/src/app"));
//! ```

pub mod acquire;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod launcher;
pub mod requirements;
pub mod runner;
pub mod shell;
pub mod ui;

pub use error::{ProvisionError, Result};
