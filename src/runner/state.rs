//! What a run has resolved so far.

use crate::acquire::{AcquiredBy, Acquisition};
use crate::error::{ProvisionError, Result};
use crate::launcher::Synthesized;
use crate::requirements::target::ResolvedCommand;
use crate::ui::Summary;
use std::fmt;

/// States of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ProbeEnvironment,
    EnsurePackageManager,
    UpdatePackageManager,
    EnsureRuntime,
    EnsurePackageInstaller,
    AcquireRepository,
    InstallApplicationDependencies,
    SynthesizeLauncher,
    ReportSummary,
}

impl Stage {
    pub const SEQUENCE: [Stage; 9] = [
        Stage::ProbeEnvironment,
        Stage::EnsurePackageManager,
        Stage::UpdatePackageManager,
        Stage::EnsureRuntime,
        Stage::EnsurePackageInstaller,
        Stage::AcquireRepository,
        Stage::InstallApplicationDependencies,
        Stage::SynthesizeLauncher,
        Stage::ReportSummary,
    ];

    /// Stages the operator may decline without failing the run.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Stage::UpdatePackageManager | Stage::InstallApplicationDependencies
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ProbeEnvironment => "probe environment",
            Stage::EnsurePackageManager => "ensure package manager",
            Stage::UpdatePackageManager => "update package manager",
            Stage::EnsureRuntime => "ensure runtime",
            Stage::EnsurePackageInstaller => "ensure package installer",
            Stage::AcquireRepository => "acquire repository",
            Stage::InstallApplicationDependencies => "install application dependencies",
            Stage::SynthesizeLauncher => "synthesize launcher",
            Stage::ReportSummary => "report summary",
        };
        f.write_str(name)
    }
}

/// Resolved commands and paths, filled in as stages succeed.
///
/// Built by the orchestrator and handed to each later stage; never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningState {
    pub version_control: Option<ResolvedCommand>,
    pub package_manager: Option<ResolvedCommand>,
    pub runtime: Option<ResolvedCommand>,
    pub package_installer: Option<ResolvedCommand>,
    pub project: Option<Acquisition>,
    pub entry_point: Option<String>,
    pub launcher: Option<Synthesized>,
    /// Optional stages that did not run, with the reason.
    pub skipped: Vec<String>,
}

/// Borrow a value an earlier stage must have resolved.
pub(crate) fn required<'s, T>(value: &'s Option<T>, what: &str) -> Result<&'s T> {
    value
        .as_ref()
        .ok_or_else(|| ProvisionError::Other(anyhow::anyhow!("{} was not resolved", what)))
}

impl ProvisioningState {
    /// Record a skipped optional stage.
    pub fn skip(&mut self, stage: Stage, reason: &str) {
        tracing::info!("Skipping {}: {}", stage, reason);
        self.skipped.push(format!("{} ({})", stage, reason));
    }

    /// Build the closing report.
    pub fn summary(&self, app_name: &str, command_name: &str, reload_hint: &str) -> Summary {
        let mut rows = Vec::new();
        let mut row = |label: &str, value: String| rows.push((label.to_string(), value));
        let shown = |c: &Option<ResolvedCommand>| {
            c.as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        row("Package manager", shown(&self.package_manager));
        row("Runtime", shown(&self.runtime));
        row("Package installer", shown(&self.package_installer));
        if let Some(project) = &self.project {
            let how = match project.method {
                AcquiredBy::Existing => "kept existing",
                AcquiredBy::Clone => "cloned",
                AcquiredBy::Archive => "from archive",
            };
            row("Project", format!("{} ({})", project.path.display(), how));
        }
        row(
            "Entry point",
            self.entry_point
                .clone()
                .unwrap_or_else(|| "none found".to_string()),
        );

        let mut hints = Vec::new();
        if let Some(launcher) = &self.launcher {
            row("Launcher", launcher.script.display().to_string());
            row("Shell profile", launcher.profile.display().to_string());
            if launcher.appended > 0 {
                hints.push(format!(
                    "Open a new terminal or run `{}` to pick up the PATH change.",
                    reload_hint
                ));
            }
        }

        Summary {
            title: format!("{} is ready. Run `{}` to start it.", app_name, command_name),
            rows,
            skipped: self.skipped.clone(),
            hints,
        }
    }
}
