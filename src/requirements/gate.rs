//! Confirmation gate.
//!
//! Every state-mutating action asks the gate first. The decision depends on
//! the `--yes` flag and on whether a human can answer:
//!
//! | auto-approve | session          | decision |
//! |--------------|------------------|----------|
//! | yes          | any              | proceed  |
//! | no           | interactive      | ask      |
//! | no           | non-interactive  | abort    |
//!
//! A non-interactive run without `--yes` never falls back to a prompt's
//! default answer.

use crate::error::{ProvisionError, Result};
use crate::ui::{Prompt, UserInterface};

/// Whether a human can answer prompts. Derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Interactive,
    NonInteractive,
}

impl SessionMode {
    pub fn from_interactive(interactive: bool) -> Self {
        if interactive {
            SessionMode::Interactive
        } else {
            SessionMode::NonInteractive
        }
    }
}

/// Outcome of the decision table, before any prompting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Ask,
    Abort,
}

/// Decides whether a mutating action may run.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationGate {
    auto_approve: bool,
    mode: SessionMode,
}

impl ConfirmationGate {
    pub fn new(auto_approve: bool, mode: SessionMode) -> Self {
        Self { auto_approve, mode }
    }

    /// Whether `--yes` was given.
    pub fn auto_approve(&self) -> bool {
        self.auto_approve
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Apply the decision table.
    pub fn decide(&self) -> GateDecision {
        match (self.auto_approve, self.mode) {
            (true, _) => GateDecision::Proceed,
            (false, SessionMode::Interactive) => GateDecision::Ask,
            (false, SessionMode::NonInteractive) => GateDecision::Abort,
        }
    }

    /// Ask to perform `action`. `Ok(())` means go ahead.
    ///
    /// Returns [`ProvisionError::DeclinedByOperator`] when the operator
    /// answers anything but an empty line, `y` or `yes`, or when nobody can be
    /// asked. Whether that is fatal is the caller's call.
    pub fn confirm(&self, ui: &mut dyn UserInterface, key: &str, action: &str) -> Result<()> {
        match self.decide() {
            GateDecision::Proceed => {
                tracing::info!("Auto-confirmed: {}", action);
                ui.message(&format!("{} (auto-confirmed)", action));
                Ok(())
            }
            GateDecision::Abort => {
                tracing::info!("Refusing without a terminal: {}", action);
                Err(ProvisionError::DeclinedByOperator {
                    action: format!(
                        "{} (no terminal to confirm on; re-run with --yes to approve)",
                        action
                    ),
                })
            }
            GateDecision::Ask => {
                let answer = ui.prompt(&Prompt::new(key, format!("{} [Y/n]", action)))?;
                if is_affirmative(&answer) {
                    Ok(())
                } else {
                    tracing::info!("Operator declined: {}", action);
                    Err(ProvisionError::DeclinedByOperator {
                        action: action.to_string(),
                    })
                }
            }
        }
    }
}

/// Empty input, `y` or `yes` in any case.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
