//! The generic "ensure" step.
//!
//! [`ensure`] brings one [`InstallTarget`] to a present state: detect, ask,
//! try each install method in order, then detect again. Side effects go
//! through an [`InstallerContext`] so tests can count and stub them.

use crate::error::{ProvisionError, Result};
use crate::requirements::gate::ConfirmationGate;
use crate::requirements::target::{InstallMethod, InstallTarget, ResolvedCommand};
use crate::shell::{execute, CommandOptions, Invocation};
use crate::ui::UserInterface;
use std::path::Path;

/// Mockable dependencies for the installer.
pub struct InstallerContext<'a> {
    /// Run a command, returning true when it exits 0.
    pub run_command: &'a dyn Fn(&Invocation, &CommandOptions) -> bool,
    /// Download a URL to a file.
    pub download: &'a dyn Fn(&str, &Path) -> anyhow::Result<()>,
    /// Prepend a directory to the process PATH.
    pub prepend_path: &'a dyn Fn(&Path),
}

/// Build the default `InstallerContext` for production use.
pub fn default_context() -> InstallerContext<'static> {
    InstallerContext {
        run_command: &|invocation, options| {
            execute(invocation, options).is_ok_and(|r| r.success)
        },
        download: &|url, dest| crate::fetch::download(url, dest),
        prepend_path: &prepend_to_path,
    }
}

/// Prepend `dir` to this process's PATH unless it is already there.
pub fn prepend_to_path(dir: &Path) {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let mut entries: Vec<_> = std::env::split_paths(&current).collect();
    if entries.iter().any(|entry| entry == dir) {
        return;
    }
    entries.insert(0, dir.to_path_buf());
    if let Ok(joined) = std::env::join_paths(entries) {
        tracing::debug!("Prepending {} to PATH", dir.display());
        std::env::set_var("PATH", joined);
    }
}

/// Make `target` present and return the command to run it.
///
/// Detection succeeding up front returns immediately with no side effects.
/// Otherwise the gate is asked once (declining is fatal), methods are tried
/// until one exits 0, and detection runs again as the verdict.
pub fn ensure(
    target: &InstallTarget,
    gate: &ConfirmationGate,
    ui: &mut dyn UserInterface,
    ctx: &InstallerContext<'_>,
) -> Result<ResolvedCommand> {
    if let Some(found) = target.detection.detect() {
        tracing::debug!("{} already present at {}", target.name, found);
        ui.success(&format!("{} found: {}", target.name, found));
        return Ok(found);
    }

    if target.methods.is_empty() {
        return Err(ProvisionError::UnresolvedDependency {
            target: target.name.clone(),
            hint: target.hint.clone(),
        });
    }

    gate.confirm(
        ui,
        &target.prompt_key(),
        &format!("{} is not installed. Install it now?", target.name),
    )?;

    let mut installed = false;
    for method in &target.methods {
        ui.message(&format!("Installing {} via {}", target.name, method.label()));
        if run_method(method, target, gate, ui, ctx)? {
            installed = true;
            break;
        }
        tracing::info!("{} method failed: {}", target.name, method.label());
        ui.warning(&format!(
            "Installing {} via {} failed",
            target.name,
            method.label()
        ));
    }

    if !installed {
        return Err(ProvisionError::UnresolvedDependency {
            target: target.name.clone(),
            hint: target.hint.clone(),
        });
    }

    match target.detection.detect() {
        Some(found) => {
            ui.success(&format!("{} installed: {}", target.name, found));
            Ok(found)
        }
        None => Err(ProvisionError::InstallVerificationFailed {
            target: target.name.clone(),
            hint: target.hint.clone(),
        }),
    }
}

/// Run one method. `Ok(false)` means fall through to the next method;
/// `Err` is fatal for the whole run.
fn run_method(
    method: &InstallMethod,
    target: &InstallTarget,
    gate: &ConfirmationGate,
    ui: &mut dyn UserInterface,
    ctx: &InstallerContext<'_>,
) -> Result<bool> {
    let options = CommandOptions {
        interactive: !gate.auto_approve(),
        timeout: target.timeout_secs,
        ..Default::default()
    };

    match method {
        InstallMethod::Script { url } => {
            let script = tempfile::Builder::new()
                .prefix("groundwork-install")
                .suffix(".sh")
                .tempfile()?;
            if let Err(e) = (ctx.download)(url, script.path()) {
                tracing::warn!("Could not download {}: {:#}", url, e);
                return Ok(false);
            }

            let mut options = options;
            if gate.auto_approve() {
                options
                    .env
                    .insert("NONINTERACTIVE".to_string(), "1".to_string());
            }
            let invocation =
                Invocation::new("bash").arg(script.path().to_string_lossy().into_owned());
            Ok((ctx.run_command)(&invocation, &options))
        }

        InstallMethod::Clone {
            url,
            destination,
            shallow,
            vcs,
        } => {
            let git = ensure(vcs, gate, ui, ctx)?;

            if is_non_empty_dir(destination) {
                tracing::warn!(
                    "{} already exists and is not empty; not cloning over it",
                    destination.display()
                );
                return Ok(false);
            }
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut args = vec!["clone".to_string()];
            if *shallow {
                args.extend(["--depth".to_string(), "1".to_string()]);
            }
            args.push(url.clone());
            args.push(destination.to_string_lossy().into_owned());
            let cloned = (ctx.run_command)(&git.invocation(args), &options);
            if !cloned && destination.exists() {
                std::fs::remove_dir_all(destination)?;
            }
            Ok(cloned)
        }

        InstallMethod::Package {
            manager,
            package,
            prerequisites,
        } => {
            for prerequisite in prerequisites {
                ui.message(&format!("Installing prerequisite {}", prerequisite));
                if !(ctx.run_command)(&manager.invocation(["install", prerequisite]), &options) {
                    tracing::warn!("Prerequisite {} failed to install", prerequisite);
                    return Ok(false);
                }
            }
            Ok((ctx.run_command)(
                &manager.invocation(["install", package]),
                &options,
            ))
        }

        InstallMethod::Command { invocation } => Ok((ctx.run_command)(invocation, &options)),
    }
}

fn is_non_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::gate::SessionMode;
    use crate::requirements::target::Detection;
    use crate::ui::MockUI;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_tool(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn tool_target(dir: &Path, name: &str) -> InstallTarget {
        InstallTarget::new(
            name,
            Detection::Binary {
                name: name.to_string(),
                dirs: vec![dir.to_path_buf()],
            },
            format!("Install {} manually, then re-run.", name),
        )
    }

    fn yes() -> ConfirmationGate {
        ConfirmationGate::new(true, SessionMode::NonInteractive)
    }

    fn no_download(_: &str, _: &Path) -> anyhow::Result<()> {
        anyhow::bail!("offline")
    }

    fn stub_ctx(command_succeeds: bool) -> InstallerContext<'static> {
        let run_cmd: &'static dyn Fn(&Invocation, &CommandOptions) -> bool = if command_succeeds {
            &|_, _| true
        } else {
            &|_, _| false
        };
        InstallerContext {
            run_command: run_cmd,
            download: &no_download,
            prepend_path: &|_| {},
        }
    }

    #[test]
    #[cfg(unix)]
    fn present_target_has_no_side_effects() {
        let temp = TempDir::new().unwrap();
        make_tool(&temp.path().join("gw-present"));
        let target = tool_target(temp.path(), "gw-present").with_method(InstallMethod::Command {
            invocation: Invocation::new("false"),
        });
        let mut ui = MockUI::new();
        let calls = Cell::new(0);
        let run = |_: &Invocation, _: &CommandOptions| {
            calls.set(calls.get() + 1);
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };

        let resolved = ensure(&target, &yes(), &mut ui, &ctx).unwrap();
        assert_eq!(resolved.program, temp.path().join("gw-present"));
        assert_eq!(calls.get(), 0);
        assert!(ui.prompts_shown().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn second_ensure_performs_no_install() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("gw-fresh");
        let target = tool_target(temp.path(), "gw-fresh").with_method(InstallMethod::Command {
            invocation: Invocation::new("install-gw-fresh"),
        });
        let calls = Cell::new(0);
        let run = |_: &Invocation, _: &CommandOptions| {
            calls.set(calls.get() + 1);
            make_tool(&tool);
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };
        let mut ui = MockUI::new();

        let first = ensure(&target, &yes(), &mut ui, &ctx).unwrap();
        let second = ensure(&target, &yes(), &mut ui, &ctx).unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn no_methods_is_unresolved_with_hint() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-git-missing");
        let mut ui = MockUI::new();

        let err = ensure(&target, &yes(), &mut ui, &stub_ctx(true)).unwrap_err();
        assert!(matches!(err, ProvisionError::UnresolvedDependency { .. }));
        assert_eq!(
            err.hint().as_deref(),
            Some("Install gw-git-missing manually, then re-run.")
        );
    }

    #[test]
    fn decline_is_fatal_and_installs_nothing() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-declined").with_method(InstallMethod::Command {
            invocation: Invocation::new("install"),
        });
        let mut ui = MockUI::new();
        ui.set_prompt_response("install_gw_declined", "n");
        let calls = Cell::new(0);
        let run = |_: &Invocation, _: &CommandOptions| {
            calls.set(calls.get() + 1);
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };
        let gate = ConfirmationGate::new(false, SessionMode::Interactive);

        let err = ensure(&target, &gate, &mut ui, &ctx).unwrap_err();
        assert!(err.is_declined());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn non_interactive_without_yes_aborts() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-ci").with_method(InstallMethod::Command {
            invocation: Invocation::new("install"),
        });
        let mut ui = MockUI::new();
        let gate = ConfirmationGate::new(false, SessionMode::NonInteractive);

        let err = ensure(&target, &gate, &mut ui, &stub_ctx(true)).unwrap_err();
        assert!(err.is_declined());
        assert!(ui.prompts_shown().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn falls_through_to_second_method() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("gw-fallback");
        let target = tool_target(temp.path(), "gw-fallback")
            .with_method(InstallMethod::Command {
                invocation: Invocation::new("first"),
            })
            .with_method(InstallMethod::Command {
                invocation: Invocation::new("second"),
            });
        let seen = RefCell::new(Vec::new());
        let run = |inv: &Invocation, _: &CommandOptions| {
            seen.borrow_mut().push(inv.program.clone());
            if inv.program == "second" {
                make_tool(&tool);
                true
            } else {
                false
            }
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };
        let mut ui = MockUI::new();

        ensure(&target, &yes(), &mut ui, &ctx).unwrap();
        assert_eq!(*seen.borrow(), ["first", "second"]);
        assert!(ui.has_warning("first"));
    }

    #[test]
    fn all_methods_failing_is_unresolved() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-broken").with_method(InstallMethod::Command {
            invocation: Invocation::new("install"),
        });
        let mut ui = MockUI::new();

        let err = ensure(&target, &yes(), &mut ui, &stub_ctx(false)).unwrap_err();
        assert!(matches!(err, ProvisionError::UnresolvedDependency { .. }));
    }

    #[test]
    fn success_without_binary_fails_verification() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-phantom").with_method(InstallMethod::Command {
            invocation: Invocation::new("install"),
        });
        let mut ui = MockUI::new();

        let err = ensure(&target, &yes(), &mut ui, &stub_ctx(true)).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::InstallVerificationFailed { .. }
        ));
    }

    #[test]
    fn script_download_failure_falls_through() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-script").with_method(InstallMethod::Script {
            url: "https://example.invalid/install.sh".into(),
        });
        let mut ui = MockUI::new();
        let calls = Cell::new(0);
        let run = |_: &Invocation, _: &CommandOptions| {
            calls.set(calls.get() + 1);
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };

        let err = ensure(&target, &yes(), &mut ui, &ctx).unwrap_err();
        assert!(matches!(err, ProvisionError::UnresolvedDependency { .. }));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn script_runs_noninteractive_when_auto_approved() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("gw-scripted");
        let target = tool_target(temp.path(), "gw-scripted").with_method(InstallMethod::Script {
            url: "https://example.invalid/install.sh".into(),
        });
        let env_seen = RefCell::new(None);
        let run = |inv: &Invocation, opts: &CommandOptions| {
            assert_eq!(inv.program, "bash");
            *env_seen.borrow_mut() = opts.env.get("NONINTERACTIVE").cloned();
            make_tool(&tool);
            true
        };
        let download = |_: &str, dest: &Path| -> anyhow::Result<()> {
            fs::write(dest, "echo install")?;
            Ok(())
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &download,
            prepend_path: &|_| {},
        };
        let mut ui = MockUI::new();

        ensure(&target, &yes(), &mut ui, &ctx).unwrap();
        assert_eq!(env_seen.borrow().as_deref(), Some("1"));
    }

    #[test]
    #[cfg(unix)]
    fn clone_ensures_vcs_first_then_clones() {
        let temp = TempDir::new().unwrap();
        let vcs_dir = temp.path().join("vcs");
        fs::create_dir(&vcs_dir).unwrap();
        make_tool(&vcs_dir.join("gw-git"));
        let checkout = temp.path().join("homebrew");
        let brew = checkout.join("bin").join("gw-brew");

        let target = InstallTarget::new(
            "gw-brew",
            Detection::Binary {
                name: "gw-brew".into(),
                dirs: vec![checkout.join("bin")],
            },
            "",
        )
        .with_method(InstallMethod::Clone {
            url: "https://github.com/Homebrew/brew".into(),
            destination: checkout.clone(),
            shallow: true,
            vcs: Box::new(tool_target(&vcs_dir, "gw-git")),
        });

        let seen = RefCell::new(Vec::<Vec<String>>::new());
        let run = |inv: &Invocation, _: &CommandOptions| {
            seen.borrow_mut().push(inv.args.clone());
            fs::create_dir_all(brew.parent().unwrap()).unwrap();
            make_tool(&brew);
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };
        let mut ui = MockUI::new();

        let resolved = ensure(&target, &yes(), &mut ui, &ctx).unwrap();
        assert_eq!(resolved.program, brew);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0][..3], ["clone", "--depth", "1"]);
        assert_eq!(PathBuf::from(&seen[0][4]), checkout);
    }

    #[test]
    fn clone_without_vcs_is_fatal() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-brew2").with_method(InstallMethod::Clone {
            url: "https://github.com/Homebrew/brew".into(),
            destination: temp.path().join("homebrew"),
            shallow: true,
            vcs: Box::new(tool_target(temp.path(), "gw-no-git")),
        });
        let mut ui = MockUI::new();

        let err = ensure(&target, &yes(), &mut ui, &stub_ctx(true)).unwrap_err();
        match err {
            ProvisionError::UnresolvedDependency { target, .. } => assert_eq!(target, "gw-no-git"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn package_installs_prerequisites_first() {
        let temp = TempDir::new().unwrap();
        let target = tool_target(temp.path(), "gw-python").with_method(InstallMethod::Package {
            manager: ResolvedCommand::new("/opt/homebrew/bin/brew"),
            package: "python@3.11".into(),
            prerequisites: vec!["tcl-tk".into()],
        });
        let seen = RefCell::new(Vec::<Vec<String>>::new());
        let run = |inv: &Invocation, _: &CommandOptions| {
            seen.borrow_mut().push(inv.args.clone());
            true
        };
        let ctx = InstallerContext {
            run_command: &run,
            download: &no_download,
            prepend_path: &|_| {},
        };
        let mut ui = MockUI::new();

        // Nothing lands on disk, so verification fails after both installs.
        let err = ensure(&target, &yes(), &mut ui, &ctx).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::InstallVerificationFailed { .. }
        ));
        assert_eq!(
            *seen.borrow(),
            vec![
                vec!["install".to_string(), "tcl-tk".to_string()],
                vec!["install".to_string(), "python@3.11".to_string()],
            ]
        );
    }

    #[test]
    fn prepend_to_path_is_idempotent() {
        let dir = PathBuf::from("/gw-test-prepend/bin");
        prepend_to_path(&dir);
        prepend_to_path(&dir);
        let path = std::env::var_os("PATH").unwrap();
        let count = std::env::split_paths(&path).filter(|p| p == &dir).count();
        assert_eq!(count, 1);
    }
}
