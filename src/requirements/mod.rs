//! Prerequisite detection and installation.
//!
//! # Modules
//!
//! - [`probe`] - Read-only environment questions (architecture, terminal, binaries)
//! - [`gate`] - Confirmation gate in front of every mutating action
//! - [`target`] - Install targets, detection predicates and install methods
//! - [`installer`] - The generic `ensure` step
//! - [`catalog`] - The concrete targets built from configuration

pub mod catalog;
pub mod gate;
pub mod installer;
pub mod probe;
pub mod target;

pub use gate::{ConfirmationGate, GateDecision, SessionMode};
pub use installer::{default_context, ensure, InstallerContext};
pub use probe::{Arch, EnvironmentProbe};
pub use target::{Detection, InstallMethod, InstallTarget, ResolvedCommand};
