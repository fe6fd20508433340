//! Environment probe.
//!
//! Answers read-only questions about the machine: its architecture, whether
//! a human is attached to the terminal, and where a given tool lives. Nothing
//! here mutates the system; the only processes started are `--version`
//! queries.
//!
//! # Example
//!
//! ```no_run
//! use groundwork::requirements::probe::{locate_binary, locate_versioned_binary};
//! use std::path::PathBuf;
//!
//! if let Some(git) = locate_binary("git") {
//!     println!("git at {}", git.display());
//! }
//! let python = locate_versioned_binary(
//!     "python3.11",
//!     &[PathBuf::from("/opt/homebrew/bin")],
//!     "3.11",
//! );
//! ```

use crate::shell::{is_ci, is_elevated, ShellInfo};
use regex::Regex;
use std::fmt;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

/// Machine architecture tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    Other(String),
}

impl Arch {
    /// Architecture of the running binary.
    pub fn detect() -> Self {
        Self::from_name(std::env::consts::ARCH)
    }

    /// Parse an architecture name as reported by `uname -m` or Rust.
    pub fn from_name(name: &str) -> Self {
        match name {
            "x86_64" | "amd64" => Arch::X86_64,
            "aarch64" | "arm64" => Arch::Aarch64,
            other => Arch::Other(other.to_string()),
        }
    }

    /// Canonical name used as a config key.
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Other(name) => name,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the environment taken once at startup.
#[derive(Debug, Clone)]
pub struct EnvironmentProbe {
    /// Machine architecture.
    pub arch: Arch,
    /// Both stdin and stdout are terminals.
    pub terminal: bool,
    /// A CI environment variable is set.
    pub ci: bool,
    /// Running as root.
    pub elevated: bool,
    /// Operator's login shell and its profile file.
    pub shell: ShellInfo,
}

impl EnvironmentProbe {
    /// Probe the current process environment.
    pub fn run(home: &Path) -> Self {
        let probe = Self {
            arch: Arch::detect(),
            terminal: is_interactive_session(),
            ci: is_ci(),
            elevated: is_elevated(),
            shell: crate::shell::detect_shell(home),
        };
        tracing::debug!("Environment probe: {:?}", probe);
        probe
    }

    /// Whether prompts can be shown: a terminal on both ends and not CI.
    pub fn interactive(&self) -> bool {
        self.terminal && !self.ci
    }
}

/// True only when both standard input and standard output are terminals.
pub fn is_interactive_session() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Check whether a file has executable permission bits set.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// On Windows, executability is determined by file extension, not permission bits.
#[cfg(not(unix))]
pub fn is_executable(_path: &Path) -> bool {
    true
}

/// Parse the system PATH environment variable into a list of directories.
pub fn parse_system_path() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).collect())
        .unwrap_or_default()
}

/// Resolve a tool's binary path by iterating over directories.
///
/// Returns the first match that exists and is executable. Does NOT use
/// the `which` command, whose behavior varies across systems.
pub fn resolve_tool_path(tool: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(tool))
        .find(|candidate| candidate.is_file() && is_executable(candidate))
}

/// Find `name` on the current PATH.
pub fn locate_binary(name: &str) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return (direct.is_file() && is_executable(direct)).then(|| direct.to_path_buf());
    }
    resolve_tool_path(name, &parse_system_path())
}

/// Find `name` whose reported version is exactly `major_minor`.
///
/// `preferred` directories are checked first, then PATH. A candidate only
/// matches when its `--version` output starts with `"<major_minor>."`, so a
/// `python3` that happens to be 3.9 never satisfies a 3.11 requirement.
pub fn locate_versioned_binary(
    name: &str,
    preferred: &[PathBuf],
    major_minor: &str,
) -> Option<PathBuf> {
    let mut dirs = preferred.to_vec();
    dirs.extend(parse_system_path());

    dirs.iter()
        .map(|dir| dir.join(name))
        .filter(|candidate| candidate.is_file() && is_executable(candidate))
        .find(|candidate| {
            let reported = reported_version(candidate);
            tracing::debug!("{} reports version {:?}", candidate.display(), reported);
            reported.is_some_and(|v| version_matches(&v, major_minor))
        })
}

/// Run `<binary> --version` and extract the first dotted version number.
///
/// Both output streams are read; some interpreters print their version to
/// stderr.
pub fn reported_version(binary: &Path) -> Option<String> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    extract_version(&text)
}

/// Extract the first `N.N` or `N.N.N` version from text.
pub fn extract_version(text: &str) -> Option<String> {
    static VERSION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").unwrap());
    VERSION.captures(text).map(|c| c[1].to_string())
}

/// Whether `reported` is in the exact `major_minor` series.
pub fn version_matches(reported: &str, major_minor: &str) -> bool {
    reported.starts_with(&format!("{}.", major_minor))
}
