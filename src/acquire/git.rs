//! Version-control clone strategy.

use crate::requirements::target::ResolvedCommand;
use crate::shell::{execute, CommandOptions};
use std::fs;
use std::path::Path;

/// Shallow-clone `url` into `destination`.
///
/// Returns false on a non-zero exit, a spawn failure or a timeout. Whatever a
/// failed clone left behind is removed so the archive fallback starts clean.
pub fn shallow_clone(
    git: &ResolvedCommand,
    url: &str,
    destination: &Path,
    timeout: Option<u64>,
) -> bool {
    let invocation = git.invocation([
        "clone".to_string(),
        "--depth".to_string(),
        "1".to_string(),
        url.to_string(),
        destination.to_string_lossy().into_owned(),
    ]);
    let options = CommandOptions {
        timeout,
        ..CommandOptions::captured()
    };

    let cloned = match execute(&invocation, &options) {
        Ok(result) if result.success => true,
        Ok(result) => {
            tracing::info!(
                "Clone of {} failed (exit {:?}, timed out: {}): {}",
                url,
                result.exit_code,
                result.timed_out,
                result.stderr.trim()
            );
            false
        }
        Err(e) => {
            tracing::info!("Clone of {} could not start: {}", url, e);
            false
        }
    };

    if !cloned && destination.exists() {
        if let Err(e) = fs::remove_dir_all(destination) {
            tracing::warn!(
                "Could not remove partial clone at {}: {}",
                destination.display(),
                e
            );
        }
    }
    cloned
}

/// Fetch the full history of a shallow clone. Failure is only logged.
pub fn complete_history(git: &ResolvedCommand, checkout: &Path, timeout: Option<u64>) {
    let invocation = git.invocation(["fetch", "--unshallow", "--quiet"]);
    let options = CommandOptions {
        cwd: Some(checkout.to_path_buf()),
        timeout,
        ..CommandOptions::captured()
    };

    match execute(&invocation, &options) {
        Ok(result) if result.success => {
            tracing::debug!("Fetched full history for {}", checkout.display())
        }
        Ok(result) => tracing::warn!(
            "History fetch for {} did not complete (exit {:?}, timed out: {})",
            checkout.display(),
            result.exit_code,
            result.timed_out
        ),
        Err(e) => tracing::warn!("History fetch for {} failed: {}", checkout.display(), e),
    }
}
