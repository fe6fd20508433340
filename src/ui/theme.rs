//! Status-line styling.
//!
//! Every operator-facing line is one of four [`Status`] kinds, each with a
//! fixed symbol. Color is decoration only: a plain theme prints the same
//! symbols and text.

use console::Style;

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Info,
    Success,
    Warning,
    Error,
}

impl Status {
    pub fn symbol(self) -> &'static str {
        match self {
            Status::Info => "→",
            Status::Success => "✓",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }
}

/// Styles for status lines, banners and the summary table.
#[derive(Debug, Clone)]
pub struct Theme {
    info: Style,
    success: Style,
    warning: Style,
    error: Style,
    banner: Style,
    /// Summary labels.
    pub key: Style,
    /// Skipped stages and other secondary text.
    pub dim: Style,
    /// Remediation hints under an error.
    pub hint: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::colored()
    }
}

impl Theme {
    pub fn colored() -> Self {
        Self {
            info: Style::new().cyan(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            banner: Style::new().cyan().bold(),
            key: Style::new().bold(),
            dim: Style::new().dim(),
            hint: Style::new().yellow().dim(),
        }
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        let none = Style::new();
        Self {
            info: none.clone(),
            success: none.clone(),
            warning: none.clone(),
            error: none.clone(),
            banner: none.clone(),
            key: none.clone(),
            dim: none.clone(),
            hint: none,
        }
    }

    fn style(&self, status: Status) -> &Style {
        match status {
            Status::Info => &self.info,
            Status::Success => &self.success,
            Status::Warning => &self.warning,
            Status::Error => &self.error,
        }
    }

    /// `<symbol> <msg>`. Info lines only color the arrow.
    pub fn line(&self, status: Status, msg: &str) -> String {
        let style = self.style(status);
        match status {
            Status::Info => format!("{} {}", style.apply_to(status.symbol()), msg),
            _ => style
                .apply_to(format!("{} {}", status.symbol(), msg))
                .to_string(),
        }
    }

    pub fn banner(&self, title: &str) -> String {
        self.banner.apply_to(format!("== {} ==", title)).to_string()
    }
}

/// Colors are used only on a terminal and when `NO_COLOR` is unset.
pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_carry_symbols() {
        let theme = Theme::plain();
        assert_eq!(theme.line(Status::Success, "Homebrew found"), "✓ Homebrew found");
        assert_eq!(theme.line(Status::Warning, "update failed"), "⚠ update failed");
        assert_eq!(theme.line(Status::Error, "declined"), "✗ declined");
        assert_eq!(theme.line(Status::Info, "Cloning"), "→ Cloning");
    }

    #[test]
    fn banner_wraps_title() {
        assert_eq!(Theme::plain().banner("Setting up Workbench"), "== Setting up Workbench ==");
    }

    #[test]
    fn colored_lines_keep_text() {
        let theme = Theme::colored();
        assert!(theme.line(Status::Error, "boom").contains("boom"));
        assert!(theme.banner("Workbench").contains("Workbench"));
    }
}
