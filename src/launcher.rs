//! Launcher script and shell-profile wiring.
//!
//! The launcher is a two-line `sh` script that execs the provisioned runtime
//! on the application's entry point. Its two substitution values are
//! validated before anything is written, and the file only becomes
//! executable under its final name once it is complete.
//!
//! The shell profile is only ever appended to, and only with lines it does
//! not already contain.
//!
//! # Example
//!
//! ```
//! use groundwork::launcher::ProfileBlock;
//! use groundwork::shell::ShellType;
//! use std::path::Path;
//!
//! let block = ProfileBlock::new(ShellType::Zsh, "# Added by groundwork")
//!     .path(Path::new("/home/me/bin"))
//!     .export("HOMEBREW_NO_ANALYTICS", "1");
//! assert_eq!(block.lines()[1], "export PATH=\"/home/me/bin:$PATH\"");
//! ```

use crate::error::{ProvisionError, Result};
use crate::requirements::target::ResolvedCommand;
use crate::shell::ShellType;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Directories already on a login shell's PATH without any profile help.
const DEFAULT_SEARCH_PATH: &[&str] = &["/usr/local/bin", "/usr/bin", "/bin", "/usr/sbin", "/sbin"];

/// Characters that would change the meaning of a double-quoted `sh` word.
const UNSAFE_CHARS: &[char] = &['"', '\\', '$', '`', '\n', '\r'];

/// Whether `dir` is on the default search path.
pub fn is_default_search_dir(dir: &Path) -> bool {
    DEFAULT_SEARCH_PATH.iter().any(|d| Path::new(d) == dir)
}

/// A validated launcher script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherScript {
    runtime: PathBuf,
    target: PathBuf,
}

impl LauncherScript {
    /// Launcher running `runtime` on `entry_point` inside `project_dir`, or on
    /// the project directory itself when no entry point was found.
    pub fn new(
        runtime: &ResolvedCommand,
        project_dir: &Path,
        entry_point: Option<&str>,
    ) -> Result<Self> {
        if !runtime.args.is_empty() {
            return Err(invalid(format!(
                "runtime must be a plain executable, got `{}`",
                runtime
            )));
        }
        let runtime_path = checked_slot("runtime", &runtime.program)?;
        let project = checked_slot("project directory", project_dir)?;

        if !project.is_dir() {
            return Err(invalid(format!(
                "project directory {} does not exist",
                project.display()
            )));
        }

        let target = match entry_point {
            Some(entry) if !entry.is_empty() => {
                checked_slot("entry point", &project.join(entry))?
            }
            _ => project,
        };

        Ok(Self {
            runtime: runtime_path,
            target,
        })
    }

    /// Script text.
    pub fn render(&self) -> String {
        format!(
            "#!/bin/sh\nexec \"{}\" \"{}\" \"$@\"\n",
            self.runtime.display(),
            self.target.display()
        )
    }

    /// Write the script to `path`, replacing any previous version.
    ///
    /// The text is written and made executable under a temporary name in the
    /// same directory, then renamed over `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| invalid(format!("{} has no parent directory", path.display())))?;
        fs::create_dir_all(dir)?;

        let mut staged = tempfile::Builder::new()
            .prefix(".groundwork-launcher")
            .tempfile_in(dir)?;
        staged.write_all(self.render().as_bytes())?;
        staged.flush()?;
        set_executable(staged.path())?;
        staged
            .persist(path)
            .map_err(|e| ProvisionError::Io(e.error))?;

        tracing::debug!("Wrote launcher {}", path.display());
        Ok(())
    }
}

fn invalid(message: String) -> ProvisionError {
    ProvisionError::LauncherInvalid { message }
}

fn checked_slot(what: &str, value: &Path) -> Result<PathBuf> {
    let text = value.to_str().ok_or_else(|| {
        invalid(format!("{} {} is not valid UTF-8", what, value.display()))
    })?;
    if text.is_empty() {
        return Err(invalid(format!("{} is empty", what)));
    }
    if !value.is_absolute() {
        return Err(invalid(format!("{} {} is not an absolute path", what, text)));
    }
    if let Some(c) = text.chars().find(|c| UNSAFE_CHARS.contains(c)) {
        return Err(invalid(format!(
            "{} {:?} contains unsupported character {:?}",
            what, text, c
        )));
    }
    Ok(value.to_path_buf())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Lines the shell profile must contain, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBlock {
    shell: ShellType,
    lines: Vec<String>,
}

impl ProfileBlock {
    /// Start a block opened by `marker`.
    pub fn new(shell: ShellType, marker: &str) -> Self {
        Self {
            shell,
            lines: vec![marker.to_string()],
        }
    }

    /// Add a PATH line for `dir`.
    pub fn path(mut self, dir: &Path) -> Self {
        self.lines.push(self.shell.path_line(dir));
        self
    }

    /// Add an exported variable.
    pub fn export(mut self, key: &str, value: &str) -> Self {
        self.lines.push(self.shell.export_line(key, value));
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Append every line not already in `profile`. Returns how many were
    /// appended.
    pub fn apply(&self, profile: &Path) -> Result<usize> {
        let existing = match fs::read_to_string(profile) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let missing: Vec<&String> = self
            .lines
            .iter()
            .filter(|line| !existing.contains(line.as_str()))
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        if let Some(dir) = profile.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(profile)?;
        if !existing.is_empty() && !existing.ends_with('\n') {
            writeln!(file)?;
        }
        for line in &missing {
            writeln!(file, "{}", line)?;
        }

        tracing::debug!(
            "Appended {} line(s) to {}",
            missing.len(),
            profile.display()
        );
        Ok(missing.len())
    }
}

/// What [`synthesize`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    /// Where the launcher was written.
    pub script: PathBuf,
    /// Profile file that was checked.
    pub profile: PathBuf,
    /// Lines appended to the profile on this run.
    pub appended: usize,
}

/// Write the launcher, wire the profile, and make `bin_dir` usable in this
/// process.
pub fn synthesize(
    script: &LauncherScript,
    script_path: &Path,
    block: &ProfileBlock,
    profile: &Path,
    prepend_path: &dyn Fn(&Path),
) -> Result<Synthesized> {
    script.write(script_path)?;
    let appended = block.apply(profile)?;
    if let Some(bin_dir) = script_path.parent() {
        prepend_path(bin_dir);
    }

    Ok(Synthesized {
        script: script_path.to_path_buf(),
        profile: profile.to_path_buf(),
        appended,
    })
}
