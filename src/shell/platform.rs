//! Login shell detection and profile-file syntax.

use std::path::{Path, PathBuf};

/// Information about the operator's login shell.
#[derive(Debug, Clone)]
pub struct ShellInfo {
    /// Shell executable path.
    pub executable: PathBuf,

    /// Shell kind.
    pub name: ShellType,

    /// Profile file read by new interactive sessions of this shell.
    pub profile: PathBuf,
}

/// Known shell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    Unknown,
}

impl ShellType {
    /// Parse shell type from executable name.
    pub fn from_executable(exe: &str) -> Self {
        let name = Path::new(exe)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match name.as_str() {
            "bash" => ShellType::Bash,
            "zsh" => ShellType::Zsh,
            "fish" => ShellType::Fish,
            _ => ShellType::Unknown,
        }
    }

    /// Profile file for this shell under `home`.
    ///
    /// macOS Terminal opens login shells, which read `.bash_profile`
    /// rather than `.bashrc`.
    pub fn profile_file(&self, home: &Path) -> PathBuf {
        match self {
            ShellType::Zsh => home.join(".zshrc"),
            ShellType::Bash if cfg!(target_os = "macos") => home.join(".bash_profile"),
            ShellType::Bash => home.join(".bashrc"),
            ShellType::Fish => home.join(".config/fish/config.fish"),
            ShellType::Unknown => home.join(".profile"),
        }
    }

    /// Line that prepends `dir` to PATH in this shell's syntax.
    pub fn path_line(&self, dir: &Path) -> String {
        match self {
            ShellType::Fish => format!("fish_add_path -g \"{}\"", dir.display()),
            _ => format!("export PATH=\"{}:$PATH\"", dir.display()),
        }
    }

    /// Line that exports `key=value` in this shell's syntax.
    pub fn export_line(&self, key: &str, value: &str) -> String {
        match self {
            ShellType::Fish => format!("set -gx {} \"{}\"", key, value),
            _ => format!("export {}=\"{}\"", key, value),
        }
    }
}

impl ShellInfo {
    /// Build shell info for a given executable and home directory.
    pub fn from_executable(executable: impl Into<PathBuf>, home: &Path) -> Self {
        let executable = executable.into();
        let name = ShellType::from_executable(&executable.to_string_lossy());
        Self {
            profile: name.profile_file(home),
            executable,
            name,
        }
    }

    /// Command the operator can run to pick up profile changes.
    pub fn reload_hint(&self) -> String {
        format!("source {}", self.profile.display())
    }
}

/// Detect the operator's login shell from `SHELL`.
pub fn detect_shell(home: &Path) -> ShellInfo {
    let executable = std::env::var("SHELL")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/bin/sh"));
    ShellInfo::from_executable(executable, home)
}

/// Check if running in a CI environment.
///
/// A CI run is never treated as interactive, even when a pseudo-terminal is
/// attached. Checks `CI`, `GITHUB_ACTIONS`, `GITLAB_CI`, `CIRCLECI`,
/// `TRAVIS` and `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_type_from_executable() {
        assert_eq!(ShellType::from_executable("/bin/bash"), ShellType::Bash);
        assert_eq!(ShellType::from_executable("/usr/bin/zsh"), ShellType::Zsh);
        assert_eq!(ShellType::from_executable("/usr/bin/fish"), ShellType::Fish);
        assert_eq!(ShellType::from_executable("/bin/sh"), ShellType::Unknown);
    }

    #[test]
    fn zsh_profile_is_zshrc() {
        let info = ShellInfo::from_executable("/bin/zsh", Path::new("/home/me"));
        assert_eq!(info.profile, PathBuf::from("/home/me/.zshrc"));
        assert_eq!(info.reload_hint(), "source /home/me/.zshrc");
    }

    #[test]
    fn unknown_shell_uses_dot_profile() {
        let info = ShellInfo::from_executable("/bin/dash", Path::new("/home/me"));
        assert_eq!(info.profile, PathBuf::from("/home/me/.profile"));
    }

    #[test]
    fn fish_profile_and_syntax() {
        let info = ShellInfo::from_executable("/usr/bin/fish", Path::new("/home/me"));
        assert!(info.profile.ends_with(".config/fish/config.fish"));
        assert_eq!(
            info.name.path_line(Path::new("/home/me/bin")),
            "fish_add_path -g \"/home/me/bin\""
        );
        assert_eq!(info.name.export_line("A", "b"), "set -gx A \"b\"");
    }

    #[test]
    fn posix_syntax() {
        assert_eq!(
            ShellType::Zsh.path_line(Path::new("/home/me/bin")),
            "export PATH=\"/home/me/bin:$PATH\""
        );
        assert_eq!(
            ShellType::Bash.export_line("HOMEBREW_NO_ANALYTICS", "1"),
            "export HOMEBREW_NO_ANALYTICS=\"1\""
        );
    }

    #[test]
    fn is_ci_detects_environment() {
        // Just ensure function doesn't panic
        let _ = is_ci();
    }
}
