//! Repository acquisition.
//!
//! Gets a copy of the application's source tree into the project directory.
//! A shallow clone is tried first; when it fails (or no version control tool
//! is available) an archive of the same revision is downloaded and
//! extracted instead.
//!
//! An existing project directory is only replaced with the operator's
//! consent. Declining keeps the existing tree and counts as success.

pub mod archive;
pub mod git;

pub use archive::{fetch_archive, single_top_level_dir, ArchiveFormat};

use crate::config::RepositoryConfig;
use crate::error::{ProvisionError, Result};
use crate::requirements::gate::ConfirmationGate;
use crate::requirements::target::ResolvedCommand;
use crate::ui::UserInterface;
use std::fs;
use std::path::{Path, PathBuf};

/// Where to fetch the application from.
#[derive(Debug, Clone)]
pub struct Source {
    /// Display name used in prompts.
    pub name: String,
    /// Clone URL.
    pub url: String,
    /// Archive URL of the same revision.
    pub archive_url: String,
    /// Limit for the clone, in seconds.
    pub clone_timeout: Option<u64>,
    /// Limit for the history fetch after a shallow clone.
    pub history_timeout: Option<u64>,
}

impl Source {
    pub fn from_config(name: &str, repo: &RepositoryConfig) -> Self {
        Self {
            name: name.to_string(),
            url: repo.url.clone(),
            archive_url: repo.archive_url.clone(),
            clone_timeout: repo.clone_timeout_secs,
            history_timeout: repo.history_timeout_secs,
        }
    }
}

/// How the project directory came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquiredBy {
    /// The operator kept a directory that was already there.
    Existing,
    Clone,
    Archive,
}

/// Result of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquisition {
    pub path: PathBuf,
    pub method: AcquiredBy,
}

/// Acquire `source` into `destination`.
///
/// `git` is the resolved version control tool, if one is available.
pub fn acquire(
    source: &Source,
    destination: &Path,
    git: Option<&ResolvedCommand>,
    gate: &ConfirmationGate,
    ui: &mut dyn UserInterface,
    download: &dyn Fn(&str, &Path) -> anyhow::Result<()>,
) -> Result<Acquisition> {
    if destination.exists() {
        let question = format!(
            "{} already exists. Remove it and fetch a fresh copy?",
            destination.display()
        );
        match gate.confirm(ui, "remove_project", &question) {
            Ok(()) => remove_existing(destination)?,
            Err(e) if e.is_declined() => {
                ui.message(&format!(
                    "Keeping existing project at {}",
                    destination.display()
                ));
                return Ok(Acquisition {
                    path: destination.to_path_buf(),
                    method: AcquiredBy::Existing,
                });
            }
            Err(e) => return Err(e),
        }
    } else {
        gate.confirm(
            ui,
            "download_project",
            &format!(
                "Download {} into {}?",
                source.name,
                destination.display()
            ),
        )?;
    }

    if let Some(git) = git {
        let mut spinner = ui.start_spinner(&format!("Cloning {}", source.url));
        if git::shallow_clone(git, &source.url, destination, source.clone_timeout) {
            spinner.set_message("Fetching history");
            git::complete_history(git, destination, source.history_timeout);
            spinner.finish_success(&format!("Cloned into {}", destination.display()));
            return Ok(Acquisition {
                path: destination.to_path_buf(),
                method: AcquiredBy::Clone,
            });
        }
        spinner.finish_error("Clone failed, falling back to archive download");
    } else {
        ui.warning("No version control tool available, downloading an archive instead");
    }

    let mut spinner = ui.start_spinner(&format!("Downloading {}", source.archive_url));
    match fetch_archive(&source.archive_url, destination, download) {
        Ok(()) => {
            spinner.finish_success(&format!("Extracted into {}", destination.display()));
            Ok(Acquisition {
                path: destination.to_path_buf(),
                method: AcquiredBy::Archive,
            })
        }
        Err(ProvisionError::AcquisitionFailed { message, .. }) => {
            spinner.finish_error("Archive download failed");
            Err(ProvisionError::AcquisitionFailed {
                url: source.url.clone(),
                message: format!("clone failed and archive fallback failed: {}", message),
            })
        }
        Err(e) => {
            spinner.finish_error("Archive extraction failed");
            Err(e)
        }
    }
}

fn remove_existing(path: &Path) -> Result<()> {
    tracing::info!("Removing {}", path.display());
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// First of `candidates` present as a file in `project`.
pub fn find_entry_point<'a>(project: &Path, candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|name| project.join(name).is_file())
        .map(String::as_str)
}
