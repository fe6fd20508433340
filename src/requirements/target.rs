//! Install targets and their strategies.
//!
//! An [`InstallTarget`] is a named prerequisite: a [`Detection`] that says
//! whether it is present, and an ordered list of [`InstallMethod`]s to try
//! when it is not. The same detection runs before and after installation.

use crate::requirements::probe::{locate_binary, locate_versioned_binary, resolve_tool_path};
use crate::shell::{execute_check, Invocation};
use std::fmt;
use std::path::{Path, PathBuf};

/// A concrete way to run a provisioned tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Absolute path of the executable.
    pub program: PathBuf,
    /// Fixed leading arguments (e.g. `-m pip`).
    pub args: Vec<String>,
}

impl ResolvedCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build an invocation of this command followed by `extra` arguments.
    pub fn invocation<I, S>(&self, extra: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new(self.program.to_string_lossy())
            .args(self.args.iter().cloned())
            .args(extra)
    }

    /// Directory holding the executable.
    pub fn bin_dir(&self) -> Option<&Path> {
        self.program.parent()
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How to tell whether a target is present.
#[derive(Debug, Clone)]
pub enum Detection {
    /// An executable in one of `dirs`, else on PATH.
    Binary { name: String, dirs: Vec<PathBuf> },

    /// An executable reporting exactly `version` (`major.minor`), checked in
    /// `dirs` first, then on PATH.
    VersionedBinary {
        name: String,
        dirs: Vec<PathBuf>,
        version: String,
    },

    /// A module the runtime can run with `-m`.
    Module {
        runtime: ResolvedCommand,
        module: String,
    },
}

impl Detection {
    /// Run the check. `Some` carries the command to use from now on.
    pub fn detect(&self) -> Option<ResolvedCommand> {
        match self {
            Detection::Binary { name, dirs } => resolve_tool_path(name, dirs)
                .or_else(|| locate_binary(name))
                .map(ResolvedCommand::new),
            Detection::VersionedBinary {
                name,
                dirs,
                version,
            } => locate_versioned_binary(name, dirs, version).map(ResolvedCommand::new),
            Detection::Module { runtime, module } => {
                let check = runtime.invocation(["-m", module.as_str(), "--version"]);
                execute_check(&check, None).then(|| {
                    runtime
                        .clone()
                        .with_args(["-m".to_string(), module.clone()])
                })
            }
        }
    }
}

/// One strategy for installing a target.
#[derive(Debug, Clone)]
pub enum InstallMethod {
    /// Download a bootstrap installer script and run it with `bash`.
    Script { url: String },

    /// Clone the target's source tree into a user-writable directory.
    /// Requires `vcs` to be ensured first.
    Clone {
        url: String,
        destination: PathBuf,
        shallow: bool,
        vcs: Box<InstallTarget>,
    },

    /// Install `package` (after each of `prerequisites`) with the package
    /// manager.
    Package {
        manager: ResolvedCommand,
        package: String,
        prerequisites: Vec<String>,
    },

    /// Run a single command.
    Command { invocation: Invocation },
}

impl InstallMethod {
    /// Short description for status lines.
    pub fn label(&self) -> String {
        match self {
            InstallMethod::Script { url } => format!("installer script from {}", url),
            InstallMethod::Clone {
                url, destination, ..
            } => format!("clone of {} into {}", url, destination.display()),
            InstallMethod::Package {
                manager, package, ..
            } => format!(
                "{} install {}",
                manager
                    .program
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| manager.to_string()),
                package
            ),
            InstallMethod::Command { invocation } => invocation.to_string(),
        }
    }
}

/// A named prerequisite.
#[derive(Debug, Clone)]
pub struct InstallTarget {
    /// Display name (e.g. "Homebrew", "Python 3.11").
    pub name: String,
    /// Presence check, used before and after installing.
    pub detection: Detection,
    /// Install strategies, tried in order.
    pub methods: Vec<InstallMethod>,
    /// Remediation shown when the target cannot be installed.
    pub hint: String,
    /// Wall-clock limit for each install command.
    pub timeout_secs: Option<u64>,
}

impl InstallTarget {
    pub fn new(name: impl Into<String>, detection: Detection, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detection,
            methods: Vec::new(),
            hint: hint.into(),
            timeout_secs: None,
        }
    }

    pub fn with_method(mut self, method: InstallMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Prompt key derived from the name: `install_python_3_11`.
    pub fn prompt_key(&self) -> String {
        let slug: String = self
            .name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("install_{}", slug)
    }
}
