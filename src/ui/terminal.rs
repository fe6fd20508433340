//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::error::Result;

use super::{
    read_line, should_use_colors, NonInteractiveUI, ProgressSpinner, Prompt, SpinnerHandle,
    Status, Summary, Theme, UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: Theme,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new() -> Self {
        let theme = if should_use_colors() {
            Theme::colored()
        } else {
            Theme::plain()
        };

        Self {
            term: Term::stdout(),
            theme,
        }
    }
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.line(Status::Info, msg)).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.line(Status::Success, msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.line(Status::Warning, msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.line(Status::Error, msg)).ok();
    }

    fn show_hint(&mut self, hint: &str) {
        writeln!(self.term, "  {}", self.theme.hint.apply_to(hint)).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<String> {
        read_line(prompt, &self.term)
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        Box::new(ProgressSpinner::new(message, self.theme.clone()))
    }

    fn show_header(&mut self, title: &str) {
        writeln!(self.term, "\n{}\n", self.theme.banner(title)).ok();
    }

    fn show_summary(&mut self, summary: &Summary) {
        writeln!(self.term).ok();
        writeln!(self.term, "{}", self.theme.line(Status::Success, &summary.title)).ok();

        let width = summary
            .rows
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(0);
        for (label, value) in &summary.rows {
            writeln!(
                self.term,
                "  {:<width$}  {}",
                self.theme.key.apply_to(label),
                value,
                width = width
            )
            .ok();
        }

        for skipped in &summary.skipped {
            writeln!(
                self.term,
                "  {}",
                self.theme.dim.apply_to(format!("○ skipped: {}", skipped))
            )
            .ok();
        }

        if !summary.hints.is_empty() {
            writeln!(self.term).ok();
            for hint in &summary.hints {
                self.show_hint(hint);
            }
        }
    }
}

/// Create the appropriate UI based on context.
pub fn create_ui(interactive: bool) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new())
    } else {
        Box::new(NonInteractiveUI::new())
    }
}
