//! `ensure` through the public API, running real commands.
#![cfg(unix)]

use groundwork::requirements::{
    ensure, ConfirmationGate, Detection, InstallMethod, InstallTarget, InstallerContext,
    SessionMode,
};
use groundwork::shell::{execute, CommandOptions, Invocation};
use groundwork::ui::MockUI;
use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn installable(dir: &Path, name: &str) -> InstallTarget {
    let tool = dir.join(name);
    let script = format!(
        "printf '#!/bin/sh\\necho 1.0\\n' > '{0}' && chmod 755 '{0}'",
        tool.display()
    );
    InstallTarget::new(
        name,
        Detection::Binary {
            name: name.to_string(),
            dirs: vec![dir.to_path_buf()],
        },
        format!("Install {} manually.", name),
    )
    .with_method(InstallMethod::Command {
        invocation: Invocation::new("sh").args(["-c".to_string(), script]),
    })
    .with_timeout(Some(30))
}

#[test]
fn second_ensure_performs_no_install() {
    let temp = TempDir::new().unwrap();
    let target = installable(temp.path(), "gw-int-tool");

    let runs = Cell::new(0);
    let run_command = |invocation: &Invocation, options: &CommandOptions| {
        runs.set(runs.get() + 1);
        execute(invocation, options).is_ok_and(|r| r.success)
    };
    let download = |_: &str, _: &Path| -> anyhow::Result<()> { anyhow::bail!("offline") };
    let prepend_path = |_: &Path| {};
    let ctx = InstallerContext {
        run_command: &run_command,
        download: &download,
        prepend_path: &prepend_path,
    };
    let gate = ConfirmationGate::new(true, SessionMode::NonInteractive);

    let mut ui = MockUI::new();
    let first = ensure(&target, &gate, &mut ui, &ctx).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(first.program, temp.path().join("gw-int-tool"));

    let mut ui = MockUI::new();
    let second = ensure(&target, &gate, &mut ui, &ctx).unwrap();
    assert_eq!(runs.get(), 1);
    assert_eq!(second, first);
    assert!(ui.prompts_shown().is_empty());
}

#[test]
fn declined_install_runs_nothing() {
    let temp = TempDir::new().unwrap();
    let target = installable(temp.path(), "gw-int-declined");

    let runs = Cell::new(0);
    let run_command = |_: &Invocation, _: &CommandOptions| {
        runs.set(runs.get() + 1);
        true
    };
    let download = |_: &str, _: &Path| -> anyhow::Result<()> { Ok(()) };
    let prepend_path = |_: &Path| {};
    let ctx = InstallerContext {
        run_command: &run_command,
        download: &download,
        prepend_path: &prepend_path,
    };
    let gate = ConfirmationGate::new(false, SessionMode::Interactive);
    let mut ui = MockUI::new();
    ui.set_prompt_response(&target.prompt_key(), "n");

    let err = ensure(&target, &gate, &mut ui, &ctx).unwrap_err();
    assert!(err.is_declined());
    assert_eq!(runs.get(), 0);
    assert!(!temp.path().join("gw-int-declined").exists());
}

#[test]
fn timed_out_method_falls_through_to_the_next() {
    let temp = TempDir::new().unwrap();
    let installer = installable(temp.path(), "gw-int-slow");
    let hung = InstallMethod::Command {
        invocation: Invocation::new("sh").args(["-c", "sleep 30; true"]),
    };
    let mut methods = vec![hung];
    methods.extend(installer.methods.clone());
    let target = InstallTarget {
        methods,
        timeout_secs: Some(1),
        ..installer
    };

    let timed_out = Cell::new(0);
    let run_command = |invocation: &Invocation, options: &CommandOptions| {
        match execute(invocation, options) {
            Ok(result) => {
                if result.timed_out {
                    timed_out.set(timed_out.get() + 1);
                }
                result.success
            }
            Err(_) => false,
        }
    };
    let download = |_: &str, _: &Path| -> anyhow::Result<()> { anyhow::bail!("offline") };
    let prepend_path = |_: &Path| {};
    let ctx = InstallerContext {
        run_command: &run_command,
        download: &download,
        prepend_path: &prepend_path,
    };
    let gate = ConfirmationGate::new(true, SessionMode::NonInteractive);
    let mut ui = MockUI::new();

    let started = Instant::now();
    let resolved = ensure(&target, &gate, &mut ui, &ctx).unwrap();

    assert_eq!(timed_out.get(), 1);
    assert_eq!(resolved.program, temp.path().join("gw-int-slow"));
    assert!(started.elapsed() < Duration::from_secs(10));
}
