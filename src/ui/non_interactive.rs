//! Non-interactive UI for piped, scripted and CI sessions.

use crate::error::{ProvisionError, Result};

use super::theme::{Status, Theme};
use super::{ProgressSpinner, Prompt, SpinnerHandle, Summary, UserInterface};

/// UI implementation for sessions without a terminal on both ends.
///
/// Status lines go to stdout, warnings and errors to stderr, all without
/// color or spinners. Prompting always fails.
pub struct NonInteractiveUI {
    theme: Theme,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new() -> Self {
        Self {
            theme: Theme::plain(),
        }
    }
}

impl Default for NonInteractiveUI {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInterface for NonInteractiveUI {
    fn message(&mut self, msg: &str) {
        println!("{}", self.theme.line(Status::Info, msg));
    }

    fn success(&mut self, msg: &str) {
        println!("{}", self.theme.line(Status::Success, msg));
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("{}", self.theme.line(Status::Warning, msg));
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.line(Status::Error, msg));
    }

    fn show_hint(&mut self, hint: &str) {
        eprintln!("  {}", hint);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<String> {
        Err(ProvisionError::DeclinedByOperator {
            action: format!("{} (no terminal to ask on)", prompt.question),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        println!("{}", self.theme.line(Status::Info, message));
        Box::new(ProgressSpinner::hidden())
    }

    fn show_header(&mut self, title: &str) {
        println!("{}", self.theme.banner(title));
    }

    fn show_summary(&mut self, summary: &Summary) {
        println!();
        println!("{}", self.theme.line(Status::Success, &summary.title));
        for (label, value) in &summary.rows {
            println!("  {}: {}", label, value);
        }
        for skipped in &summary.skipped {
            println!("  skipped: {}", skipped);
        }
        for hint in &summary.hints {
            println!("  {}", hint);
        }
    }
}
