//! External process execution and login-shell detection.

pub mod command;
pub mod platform;

pub use command::{execute, execute_check, CommandOptions, CommandResult, Invocation};
pub use platform::{detect_shell, is_ci, is_elevated, ShellInfo, ShellType};
