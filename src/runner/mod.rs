//! Provisioning run orchestration.

pub mod lock;
pub mod orchestrator;
pub mod state;

pub use lock::ProvisionLock;
pub use orchestrator::Provisioner;
pub use state::{ProvisioningState, Stage};
