//! The concrete install targets.
//!
//! Each builder turns configuration (and whatever earlier steps resolved)
//! into an [`InstallTarget`]. Builders never touch the system.

use crate::config::{MethodConfig, ResolvedConfig};
use crate::requirements::target::{Detection, InstallMethod, InstallTarget, ResolvedCommand};
use std::path::PathBuf;

/// Version control tool. It has no automatic install method.
pub fn version_control(resolved: &ResolvedConfig) -> InstallTarget {
    let vcs = &resolved.config.version_control;
    InstallTarget::new(
        &vcs.name,
        Detection::Binary {
            name: vcs.binary.clone(),
            dirs: Vec::new(),
        },
        &vcs.install_hint,
    )
}

/// The package manager, installed by script or by a clone into the home
/// directory.
pub fn package_manager(resolved: &ResolvedConfig) -> InstallTarget {
    let pm = &resolved.config.package_manager;
    let dirs = resolved
        .manager_prefixes
        .iter()
        .map(|prefix| prefix.join("bin"))
        .collect();

    let mut target = InstallTarget::new(
        &pm.name,
        Detection::Binary {
            name: pm.binary.clone(),
            dirs,
        },
        &pm.install_hint,
    )
    .with_timeout(pm.install_timeout_secs);

    for method in &pm.methods {
        target = target.with_method(match method {
            MethodConfig::Script { url } => InstallMethod::Script { url: url.clone() },
            MethodConfig::Clone {
                url,
                destination,
                shallow,
            } => InstallMethod::Clone {
                url: url.clone(),
                destination: resolved.expand(destination),
                shallow: *shallow,
                vcs: Box::new(version_control(resolved)),
            },
        });
    }
    target
}

/// Install prefix of a resolved package manager (`<prefix>/bin/brew`).
pub fn manager_prefix(manager: &ResolvedCommand) -> Option<PathBuf> {
    manager
        .bin_dir()
        .and_then(|bin| bin.parent())
        .map(|prefix| prefix.to_path_buf())
}

/// The exact-version runtime, installed with the package manager.
///
/// Detection looks in the manager's own directories before PATH so a
/// freshly installed runtime wins over an older system one.
pub fn runtime(resolved: &ResolvedConfig, manager: &ResolvedCommand) -> InstallTarget {
    let rt = &resolved.config.runtime;

    let mut dirs = Vec::new();
    if let Some(prefix) = manager_prefix(manager) {
        dirs.push(prefix.join("bin"));
        dirs.push(prefix.join("opt").join(&rt.package).join("bin"));
    }
    for prefix in &resolved.manager_prefixes {
        let bin = prefix.join("bin");
        if !dirs.contains(&bin) {
            dirs.push(bin);
        }
    }

    InstallTarget::new(
        &rt.name,
        Detection::VersionedBinary {
            name: rt.binary.clone(),
            dirs,
            version: rt.version.clone(),
        },
        &rt.install_hint,
    )
    .with_timeout(rt.install_timeout_secs)
    .with_method(InstallMethod::Package {
        manager: manager.clone(),
        package: rt.package.clone(),
        prerequisites: rt.prerequisites.clone(),
    })
}

/// The runtime's package installer module, bootstrapped when missing.
pub fn package_installer(resolved: &ResolvedConfig, runtime: &ResolvedCommand) -> InstallTarget {
    let pi = &resolved.config.package_installer;
    let bootstrap = runtime.invocation(["-m", pi.bootstrap_module.as_str(), "--upgrade"]);
    let hint = format!("Run `{}` manually, then re-run.", bootstrap);

    InstallTarget::new(
        &pi.name,
        Detection::Module {
            runtime: runtime.clone(),
            module: pi.module.clone(),
        },
        hint,
    )
    .with_timeout(pi.install_timeout_secs)
    .with_method(InstallMethod::Command {
        invocation: bootstrap,
    })
}
