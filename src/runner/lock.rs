//! Advisory lock against concurrent runs on one project directory.
//!
//! The lock file holds the owner's PID. A file whose owner no longer exists
//! (the run was interrupted before it could clean up) is reclaimed.

use crate::error::{ProvisionError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Held for the duration of a run; the lock file is removed on drop.
#[derive(Debug)]
pub struct ProvisionLock {
    path: PathBuf,
}

impl ProvisionLock {
    /// Lock file used for `destination`.
    ///
    /// It sits in the nearest directory that already exists, normally the
    /// destination's parent: `/home/me/.workbench.groundwork.lock`. When
    /// intermediate directories are missing their names become part of the
    /// file name, so taking the lock never creates directories.
    pub fn path_for(destination: &Path) -> PathBuf {
        let mut dir = destination.parent().unwrap_or(Path::new("."));
        let mut missing = vec![destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()];

        while !dir.as_os_str().is_empty() && !dir.is_dir() {
            let Some(parent) = dir.parent() else { break };
            if let Some(name) = dir.file_name() {
                missing.push(name.to_string_lossy().into_owned());
            }
            dir = parent;
        }
        if dir.as_os_str().is_empty() {
            dir = Path::new(".");
        }

        missing.reverse();
        let stem = missing.join("-");
        let name = if stem.is_empty() {
            ".groundwork.lock".to_string()
        } else {
            format!(".{}.groundwork.lock", stem)
        };
        dir.join(name)
    }

    /// Take the lock for `destination`, failing if another live run holds it.
    pub fn acquire(destination: &Path) -> Result<Self> {
        let path = Self::path_for(destination);

        match Self::create(&path) {
            Err(ProvisionError::ProvisionLocked { .. }) if Self::is_stale(&path) => {
                tracing::warn!("Removing stale lock {}", path.display());
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ProvisionError::ProvisionLocked {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let lock = Self {
            path: path.to_path_buf(),
        };
        writeln!(file, "{}", std::process::id())?;

        tracing::debug!("Acquired {}", path.display());
        Ok(lock)
    }

    /// A lock is stale when it names a PID that is no longer running. A
    /// file without a readable PID may belong to a run still writing it.
    fn is_stale(path: &Path) -> bool {
        fs::read_to_string(path)
            .ok()
            .and_then(|text| text.trim().parse::<u32>().ok())
            .is_some_and(|pid| !process_alive(pid))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProvisionLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Could not remove lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // SAFETY: signal 0 performs the existence and permission checks only.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
