//! The provisioning state machine.
//!
//! Stages run strictly in [`Stage::SEQUENCE`] order and each is terminal on
//! failure. Only the update and application-dependency stages may be
//! declined without ending the run.

use crate::acquire::{self, find_entry_point, Source};
use crate::config::ResolvedConfig;
use crate::error::{ProvisionError, Result};
use crate::launcher::{self, is_default_search_dir, LauncherScript, ProfileBlock};
use crate::requirements::catalog;
use crate::requirements::gate::ConfirmationGate;
use crate::requirements::installer::{ensure, InstallerContext};
use crate::shell::{CommandOptions, ShellInfo};
use crate::ui::UserInterface;

use super::lock::ProvisionLock;
use super::state::{required, ProvisioningState, Stage};

/// Runs every stage against one resolved configuration.
pub struct Provisioner<'a> {
    resolved: &'a ResolvedConfig,
    gate: ConfirmationGate,
    shell: ShellInfo,
    ctx: &'a InstallerContext<'a>,
    elevated: bool,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        resolved: &'a ResolvedConfig,
        gate: ConfirmationGate,
        shell: ShellInfo,
        ctx: &'a InstallerContext<'a>,
    ) -> Self {
        Self {
            resolved,
            gate,
            shell,
            ctx,
            elevated: false,
        }
    }

    /// Note that the process runs as root.
    pub fn with_elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// Run all stages. The returned state is what the summary reported.
    pub fn run(&self, ui: &mut dyn UserInterface) -> Result<ProvisioningState> {
        let _lock = ProvisionLock::acquire(&self.resolved.destination)?;
        let mut state = ProvisioningState::default();

        for stage in Stage::SEQUENCE {
            if stage.is_optional() {
                tracing::info!("Stage: {} (optional)", stage);
            } else {
                tracing::info!("Stage: {}", stage);
            }
            self.step(stage, &mut state, ui)?;
        }
        Ok(state)
    }

    fn step(
        &self,
        stage: Stage,
        state: &mut ProvisioningState,
        ui: &mut dyn UserInterface,
    ) -> Result<()> {
        let config = &self.resolved.config;
        match stage {
            Stage::ProbeEnvironment => {
                ui.show_header(&format!("Setting up {}", config.app_name));
                tracing::debug!(
                    "arch={} shell={:?} profile={}",
                    self.resolved.arch,
                    self.shell.name,
                    self.shell.profile.display()
                );
                if self.elevated {
                    ui.warning(
                        "Running as root. Everything will be installed for root, not for your user.",
                    );
                }
                state.version_control = catalog::version_control(self.resolved)
                    .detection
                    .detect();
            }

            Stage::EnsurePackageManager => {
                let manager = ensure(
                    &catalog::package_manager(self.resolved),
                    &self.gate,
                    ui,
                    self.ctx,
                )?;
                if let Some(bin) = manager.bin_dir() {
                    (self.ctx.prepend_path)(bin);
                }
                state.package_manager = Some(manager);
            }

            Stage::UpdatePackageManager => {
                if !config.package_manager.update {
                    return Ok(());
                }
                let manager = required(&state.package_manager, "package manager")?.clone();
                let question = format!("Update {} now?", config.package_manager.name);
                match self.gate.confirm(ui, "update_package_manager", &question) {
                    Ok(()) => {
                        let options = CommandOptions {
                            interactive: !self.gate.auto_approve(),
                            ..Default::default()
                        };
                        if (self.ctx.run_command)(&manager.invocation(["update"]), &options) {
                            ui.success(&format!("{} updated", config.package_manager.name));
                        } else {
                            ui.warning(&format!(
                                "{} update failed, continuing with the installed version",
                                config.package_manager.name
                            ));
                            state.skip(stage, "update failed");
                        }
                    }
                    Err(e) if e.is_declined() => state.skip(stage, "declined"),
                    Err(e) => return Err(e),
                }
            }

            Stage::EnsureRuntime => {
                let manager = required(&state.package_manager, "package manager")?;
                let runtime = catalog::runtime(self.resolved, manager);
                state.runtime = Some(ensure(&runtime, &self.gate, ui, self.ctx)?);
            }

            Stage::EnsurePackageInstaller => {
                let runtime = required(&state.runtime, "runtime")?;
                let installer = catalog::package_installer(self.resolved, runtime);
                state.package_installer = Some(ensure(&installer, &self.gate, ui, self.ctx)?);
            }

            Stage::AcquireRepository => {
                let source = Source::from_config(&config.app_name, &config.repository);
                let acquired = acquire::acquire(
                    &source,
                    &self.resolved.destination,
                    state.version_control.as_ref(),
                    &self.gate,
                    ui,
                    self.ctx.download,
                )?;
                state.entry_point =
                    find_entry_point(&acquired.path, &config.repository.entry_points)
                        .map(String::from);
                match &state.entry_point {
                    Some(entry) => ui.success(&format!("Found entry point {}", entry)),
                    None => ui.warning("No known entry point found in the project"),
                }
                state.project = Some(acquired);
            }

            Stage::InstallApplicationDependencies => {
                let project = &required(&state.project, "project directory")?.path;
                let installer = required(&state.package_installer, "package installer")?;
                let requirements = project.join(&config.repository.requirements_file);

                if !requirements.is_file() {
                    ui.warning(&format!(
                        "{} not found, skipping dependency install",
                        requirements.display()
                    ));
                    state.skip(stage, "no requirements file");
                    return Ok(());
                }

                let question = format!(
                    "Install {}'s dependencies from {}?",
                    config.app_name, config.repository.requirements_file
                );
                match self.gate.confirm(ui, "install_dependencies", &question) {
                    Ok(()) => {}
                    Err(e) if e.is_declined() => {
                        state.skip(stage, "declined");
                        return Ok(());
                    }
                    Err(e) => return Err(e),
                }

                let invocation = installer.invocation([
                    "install".to_string(),
                    "-r".to_string(),
                    requirements.to_string_lossy().into_owned(),
                ]);
                let options = CommandOptions {
                    cwd: Some(project.clone()),
                    interactive: !self.gate.auto_approve(),
                    ..Default::default()
                };
                if !(self.ctx.run_command)(&invocation, &options) {
                    return Err(ProvisionError::UnresolvedDependency {
                        target: format!("{} dependencies", config.app_name),
                        hint: format!(
                            "Run `{}` in {} to see the error.",
                            invocation,
                            project.display()
                        ),
                    });
                }
                ui.success("Application dependencies installed");
            }

            Stage::SynthesizeLauncher => {
                let runtime = required(&state.runtime, "runtime")?;
                let project = &required(&state.project, "project directory")?.path;
                let script =
                    LauncherScript::new(runtime, project, state.entry_point.as_deref())?;

                let mut block = ProfileBlock::new(self.shell.name, &config.launcher.marker)
                    .path(&self.resolved.bin_dir);
                if let Some(bin) = state.package_manager.as_ref().and_then(|m| m.bin_dir()) {
                    if !is_default_search_dir(bin) {
                        block = block.path(bin);
                    }
                }
                for (key, value) in &config.launcher.exports {
                    block = block.export(key, value);
                }

                let done = launcher::synthesize(
                    &script,
                    &self.resolved.launcher_path,
                    &block,
                    &self.shell.profile,
                    self.ctx.prepend_path,
                )?;
                ui.success(&format!("Launcher written to {}", done.script.display()));
                state.launcher = Some(done);
            }

            Stage::ReportSummary => {
                let summary = state.summary(
                    &config.app_name,
                    &config.launcher.command_name,
                    &self.shell.reload_hint(),
                );
                ui.show_summary(&summary);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquire::AcquiredBy;
    use crate::config::{default_config, MethodConfig, ProvisionConfig};
    use crate::requirements::gate::SessionMode;
    use crate::requirements::probe::Arch;
    use crate::shell::Invocation;
    use crate::ui::MockUI;
    use std::cell::RefCell;
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A sandbox where every tool has a unique name and lives under a
    /// temporary home, so nothing on the host is found or touched.
    struct Sandbox {
        temp: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
            }
        }

        fn home(&self) -> &Path {
            self.temp.path()
        }

        fn prefix(&self) -> PathBuf {
            self.home().join("brew-prefix")
        }

        fn project(&self) -> PathBuf {
            self.home().join("workbench")
        }

        fn pip_marker(&self) -> PathBuf {
            self.home().join("pip-installed")
        }

        fn config(&self) -> ProvisionConfig {
            let mut config = default_config().unwrap();
            config.version_control.binary = "gw-orch-no-git".into();
            config.package_manager.binary = "gw-orch-brew".into();
            config.package_manager.prefixes = vec![self.prefix().to_string_lossy().into_owned()];
            config.package_manager.arch_prefixes.clear();
            config.package_manager.methods = vec![MethodConfig::Script {
                url: "https://example.invalid/install.sh".into(),
            }];
            config.runtime.binary = "gw-orch-python3.11".into();
            config.runtime.prerequisites.clear();
            config.repository.archive_url = "https://example.invalid/main.zip".into();
            config.launcher.bin_dir = self.home().join("bin").to_string_lossy().into_owned();
            config
        }

        fn resolved(&self) -> ResolvedConfig {
            ResolvedConfig::resolve(
                self.config(),
                self.home(),
                Arch::X86_64,
                Some(self.project()),
            )
        }

        fn shell(&self) -> ShellInfo {
            ShellInfo::from_executable("/bin/zsh", self.home())
        }

        #[cfg(unix)]
        fn install_brew(&self) {
            write_tool(&self.prefix().join("bin/gw-orch-brew"), "exit 0");
        }

        #[cfg(unix)]
        fn install_python(&self) {
            let marker = self.pip_marker();
            write_tool(
                &self.prefix().join("bin/gw-orch-python3.11"),
                &format!(
                    r#"[ "$1" = "--version" ] && echo "Python 3.11.9" && exit 0
[ "$1" = "-m" ] && [ "$2" = "pip" ] && [ -f "{}" ] && exit 0
exit 1"#,
                    marker.display()
                ),
            );
        }
    }

    #[cfg(unix)]
    fn write_tool(path: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn write_archive(dest: &Path) -> anyhow::Result<()> {
        let mut zip = zip::ZipWriter::new(fs::File::create(dest)?);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("workbench-main/main.py", options)?;
        zip.write_all(b"print('workbench')\n")?;
        zip.start_file("workbench-main/requirements.txt", options)?;
        zip.write_all(b"requests\n")?;
        zip.finish()?;
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn fresh_machine_with_yes_converges_without_prompts() {
        let sandbox = Sandbox::new();
        let resolved = sandbox.resolved();
        let commands = RefCell::new(Vec::<String>::new());

        let run = |inv: &Invocation, _: &CommandOptions| {
            commands.borrow_mut().push(inv.to_string());
            if inv.program == "bash" {
                sandbox.install_brew();
            } else if inv.args.first().map(String::as_str) == Some("install")
                && inv.args.get(1).map(String::as_str) == Some("python@3.11")
            {
                sandbox.install_python();
            } else if inv.args.iter().any(|a| a == "ensurepip") {
                fs::write(sandbox.pip_marker(), "").unwrap();
            }
            true
        };
        let download = |url: &str, dest: &Path| -> anyhow::Result<()> {
            if url.ends_with(".zip") {
                write_archive(dest)
            } else {
                fs::write(dest, "echo installing")?;
                Ok(())
            }
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &download,
            prepend_path: &|_| {},
        };
        let gate = ConfirmationGate::new(true, SessionMode::NonInteractive);
        let mut ui = MockUI::new();

        let state = Provisioner::new(&resolved, gate, sandbox.shell(), &ctx)
            .run(&mut ui)
            .unwrap();

        assert!(ui.prompts_shown().is_empty());
        assert_eq!(
            state.project.as_ref().map(|p| p.method),
            Some(AcquiredBy::Archive)
        );
        assert_eq!(state.entry_point.as_deref(), Some("main.py"));

        let summary = &ui.summaries()[0];
        for label in [
            "Package manager",
            "Runtime",
            "Package installer",
            "Project",
            "Launcher",
        ] {
            let value = summary.value(label).unwrap();
            assert_ne!(value, "-", "{label} unresolved");
        }

        let launcher = fs::read_to_string(&resolved.launcher_path).unwrap();
        assert!(launcher.contains("gw-orch-python3.11"));
        assert!(launcher.contains("workbench/main.py"));

        let commands = commands.borrow();
        assert!(commands.iter().any(|c| c.ends_with(" update")));
        assert!(commands.iter().any(|c| c.contains("-m pip install -r")));

        let profile = fs::read_to_string(sandbox.home().join(".zshrc")).unwrap();
        assert!(profile.contains("# Added by groundwork"));
        assert!(profile.contains(&format!("{}", resolved.bin_dir.display())));
        // The lock file is gone after the run.
        assert!(!ProvisionLock::path_for(&resolved.destination).exists());
    }

    #[test]
    #[cfg(unix)]
    fn existing_setup_keeps_project_and_still_installs_dependencies() {
        let sandbox = Sandbox::new();
        sandbox.install_brew();
        sandbox.install_python();
        fs::write(sandbox.pip_marker(), "").unwrap();
        fs::create_dir_all(sandbox.project()).unwrap();
        fs::write(sandbox.project().join("app.py"), "local").unwrap();
        fs::write(sandbox.project().join("requirements.txt"), "requests\n").unwrap();
        let resolved = sandbox.resolved();

        let commands = RefCell::new(Vec::<Vec<String>>::new());
        let run = |inv: &Invocation, _: &CommandOptions| {
            commands.borrow_mut().push(inv.args.clone());
            true
        };
        let download = |_: &str, _: &Path| -> anyhow::Result<()> {
            panic!("nothing should be downloaded")
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &download,
            prepend_path: &|_| {},
        };
        let gate = ConfirmationGate::new(false, SessionMode::Interactive);
        let mut ui = MockUI::new();
        ui.set_prompt_response("update_package_manager", "n");
        ui.set_prompt_response("remove_project", "n");
        ui.set_prompt_response("install_dependencies", "y");

        let state = Provisioner::new(&resolved, gate, sandbox.shell(), &ctx)
            .run(&mut ui)
            .unwrap();

        assert_eq!(
            ui.prompts_shown(),
            [
                "update_package_manager",
                "remove_project",
                "install_dependencies"
            ]
        );
        assert_eq!(
            state.project.as_ref().map(|p| p.method),
            Some(AcquiredBy::Existing)
        );
        assert_eq!(
            fs::read_to_string(sandbox.project().join("app.py")).unwrap(),
            "local"
        );
        assert_eq!(state.entry_point.as_deref(), Some("app.py"));

        let commands = commands.borrow();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0][..3], ["-m", "pip", "install"]);
        assert_eq!(state.skipped, ["update package manager (declined)"]);
    }

    #[test]
    #[cfg(unix)]
    fn non_interactive_without_yes_aborts_on_first_install() {
        let sandbox = Sandbox::new();
        let resolved = sandbox.resolved();
        let ran = RefCell::new(0);
        let run = |_: &Invocation, _: &CommandOptions| {
            *ran.borrow_mut() += 1;
            true
        };
        let download = |_: &str, _: &Path| -> anyhow::Result<()> { Ok(()) };
        let ctx = InstallerContext {
            run_command: &run,
            download: &download,
            prepend_path: &|_| {},
        };
        let gate = ConfirmationGate::new(false, SessionMode::NonInteractive);
        let mut ui = MockUI::new();

        let err = Provisioner::new(&resolved, gate, sandbox.shell(), &ctx)
            .run(&mut ui)
            .unwrap_err();

        assert!(err.is_declined());
        assert_eq!(*ran.borrow(), 0);
        assert!(ui.prompts_shown().is_empty());
        assert!(ui.summaries().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn failing_dependency_install_is_fatal() {
        let sandbox = Sandbox::new();
        sandbox.install_brew();
        sandbox.install_python();
        fs::write(sandbox.pip_marker(), "").unwrap();
        fs::create_dir_all(sandbox.project()).unwrap();
        fs::write(sandbox.project().join("requirements.txt"), "nope==0\n").unwrap();
        let mut config = sandbox.config();
        config.package_manager.update = false;
        let resolved =
            ResolvedConfig::resolve(config, sandbox.home(), Arch::X86_64, Some(sandbox.project()));

        let run = |_: &Invocation, _: &CommandOptions| false;
        let download = |_: &str, _: &Path| -> anyhow::Result<()> { Ok(()) };
        let ctx = InstallerContext {
            run_command: &run,
            download: &download,
            prepend_path: &|_| {},
        };
        // Auto-approve would remove the existing project; keep it by
        // answering interactively.
        let gate = ConfirmationGate::new(false, SessionMode::Interactive);
        let mut ui = MockUI::new();
        ui.set_prompt_response("remove_project", "n");

        let err = Provisioner::new(&resolved, gate, sandbox.shell(), &ctx)
            .run(&mut ui)
            .unwrap_err();

        match err {
            ProvisionError::UnresolvedDependency { target, hint } => {
                assert_eq!(target, "Workbench dependencies");
                assert!(hint.contains("pip install -r"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn concurrent_run_is_refused() {
        let sandbox = Sandbox::new();
        let resolved = sandbox.resolved();
        let _held = ProvisionLock::acquire(&resolved.destination).unwrap();
        let ctx = InstallerContext {
            run_command: &|_, _| true,
            download: &|_, _| Ok(()),
            prepend_path: &|_| {},
        };
        let gate = ConfirmationGate::new(true, SessionMode::NonInteractive);
        let mut ui = MockUI::new();

        let err = Provisioner::new(&resolved, gate, sandbox.shell(), &ctx)
            .run(&mut ui)
            .unwrap_err();
        assert!(matches!(err, ProvisionError::ProvisionLocked { .. }));
        assert!(ui.headers().is_empty());
    }
}
