//! Error types for provisioning operations.
//!
//! This module defines [`ProvisionError`], the error type every component
//! converts its failures into, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - External tool failures are caught where the tool is invoked and turned
//!   into one of the taxonomy variants below with a readable diagnostic
//! - Helpers that only need context strings use `anyhow` and are translated
//!   at the component boundary
//! - Every fatal variant carries a remediation hint via [`ProvisionError::hint`]

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for provisioning.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The operator (or the non-interactive gate) declined an action.
    #[error("Declined: {action}")]
    DeclinedByOperator { action: String },

    /// Every install method for a target was exhausted.
    #[error("Could not install {target}: all install methods failed")]
    UnresolvedDependency { target: String, hint: String },

    /// Install reported success but detection still fails.
    #[error("{target} was installed but could not be found afterwards")]
    InstallVerificationFailed { target: String, hint: String },

    /// Neither clone nor archive fetch produced the project directory.
    #[error("Could not obtain {url}: {message}")]
    AcquisitionFailed { url: String, message: String },

    /// The extracted archive did not contain exactly one top-level directory.
    #[error("Unexpected layout in {archive}: {message}")]
    ExtractionFailed { archive: PathBuf, message: String },

    /// A launcher substitution value failed validation.
    #[error("Cannot write launcher: {message}")]
    LauncherInvalid { message: String },

    /// Another run holds the advisory lock for the destination.
    #[error("Another provisioning run is in progress (lock file {path})")]
    ProvisionLocked { path: PathBuf },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Process could not be spawned or waited on.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProvisionError {
    /// Remediation text shown beneath the error line, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::DeclinedByOperator { .. } => {
                Some("Re-run with --yes to approve every step without prompting.".to_string())
            }
            Self::UnresolvedDependency { hint, .. }
            | Self::InstallVerificationFailed { hint, .. } => Some(hint.clone()),
            Self::AcquisitionFailed { .. } => Some(
                "Check your network connection, or clone the repository manually into PROJECT_DIR and re-run."
                    .to_string(),
            ),
            Self::ExtractionFailed { .. } => {
                Some("Download and extract the archive manually, then re-run.".to_string())
            }
            Self::ProvisionLocked { path } => Some(format!(
                "Wait for the other run to finish, or delete {} if it is stale.",
                path.display()
            )),
            _ => None,
        }
    }

    /// Whether this error came from the operator declining a step.
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::DeclinedByOperator { .. })
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
