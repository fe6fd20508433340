//! The provisioning run.
//!
//! Loads configuration, resolves it against the probed environment and
//! hands everything to the [`Provisioner`].

use std::path::{Path, PathBuf};

use crate::config::{load_from_env, ResolvedConfig, PROJECT_DIR_ENV};
use crate::error::{ProvisionError, Result};
use crate::requirements::gate::{ConfirmationGate, SessionMode};
use crate::requirements::installer::default_context;
use crate::requirements::probe::EnvironmentProbe;
use crate::runner::{Provisioner, ProvisioningState};
use crate::ui::UserInterface;

use super::args::Cli;

/// One invocation of `groundwork`.
pub struct ProvisionCommand {
    args: Cli,
    home: PathBuf,
    probe: EnvironmentProbe,
}

impl ProvisionCommand {
    pub fn new(args: Cli, home: &Path, probe: EnvironmentProbe) -> Self {
        Self {
            args,
            home: home.to_path_buf(),
            probe,
        }
    }

    /// Whether prompts can be shown in this session.
    pub fn interactive(&self) -> bool {
        self.probe.interactive()
    }

    /// Resolve configuration for this machine.
    ///
    /// A non-empty `PROJECT_DIR` replaces the configured destination; a
    /// relative one is taken from the current directory.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let config = load_from_env()?;
        let project_dir = match std::env::var_os(PROJECT_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
        {
            Some(dir) if dir.is_relative() && !dir.starts_with("~") => {
                Some(std::env::current_dir()?.join(dir))
            }
            other => other,
        };
        if let Some(dir) = &project_dir {
            tracing::debug!("{} overrides destination: {}", PROJECT_DIR_ENV, dir.display());
        }
        Ok(ResolvedConfig::resolve(
            config,
            &self.home,
            self.probe.arch.clone(),
            project_dir,
        ))
    }

    pub fn execute(&self, ui: &mut dyn UserInterface) -> Result<ProvisioningState> {
        let resolved = self.resolve()?;
        let gate = ConfirmationGate::new(
            self.args.yes,
            SessionMode::from_interactive(self.interactive()),
        );
        let ctx = default_context();

        Provisioner::new(&resolved, gate, self.probe.shell.clone(), &ctx)
            .with_elevated(self.probe.elevated)
            .run(ui)
    }
}

/// The operator's home directory.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        ProvisionError::Other(anyhow::anyhow!(
            "could not determine the home directory; set HOME and re-run"
        ))
    })
}
