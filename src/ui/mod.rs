//! Operator-facing output and prompts.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for piped/CI sessions, which never prompts
//! - [`MockUI`] for tests
//!
//! Styling is cosmetic: every status line maps to one of message, success,
//! warning or error and carries no extra meaning.
//!
//! # Example
//!
//! ```
//! use groundwork::ui::{create_ui, UserInterface};
//!
//! let mut ui = create_ui(false);
//! ui.show_header("Workbench");
//! ui.success("Homebrew found");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::{MockSpinner, MockUI};
pub use non_interactive::NonInteractiveUI;
pub use prompts::read_line;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, Status, Theme};

use crate::error::Result;

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Display a plain informational line.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Show a hint beneath an error or summary.
    fn show_hint(&mut self, hint: &str);

    /// Ask a question and read one line of input.
    fn prompt(&mut self, prompt: &Prompt) -> Result<String>;

    /// Start a spinner for an operation whose output is captured.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Show the final convergence summary.
    fn show_summary(&mut self, summary: &Summary);
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);
}

/// A one-line question for the operator.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Stable key for the prompt (used by tests and logs).
    pub key: String,
    /// The question to display.
    pub question: String,
}

impl Prompt {
    pub fn new(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
        }
    }
}

/// Final report of what the run converged to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Title line.
    pub title: String,
    /// Label/value pairs, in display order.
    pub rows: Vec<(String, String)>,
    /// Steps that were skipped, with the reason.
    pub skipped: Vec<String>,
    /// Closing hints (e.g. how to reload the shell).
    pub hints: Vec<String>,
}

impl Summary {
    /// Value for a row label, if present.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_value_looks_up_label() {
        let summary = Summary {
            title: "done".to_string(),
            rows: vec![
                ("Runtime".to_string(), "/opt/homebrew/bin/python3.11".to_string()),
                ("Project".to_string(), "/home/me/workbench".to_string()),
            ],
            ..Default::default()
        };
        assert_eq!(summary.value("Project"), Some("/home/me/workbench"));
        assert_eq!(summary.value("Launcher"), None);
    }

    #[test]
    fn prompt_new_sets_fields() {
        let prompt = Prompt::new("install_homebrew", "Install Homebrew now?");
        assert_eq!(prompt.key, "install_homebrew");
        assert!(prompt.question.contains("Homebrew"));
    }
}
