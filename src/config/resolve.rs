//! Turning configured strings into concrete paths.
//!
//! Resolution happens once per run, before any step executes, so every
//! later component works with absolute paths.

use crate::config::schema::{MethodConfig, ProvisionConfig};
use crate::requirements::probe::Arch;
use std::path::{Path, PathBuf};

/// Configuration with every path made absolute.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The parsed configuration.
    pub config: ProvisionConfig,

    /// Operator's home directory.
    pub home: PathBuf,

    /// Machine architecture the prefixes were ordered for.
    pub arch: Arch,

    /// Project directory the application is acquired into.
    pub destination: PathBuf,

    /// Personal binary directory.
    pub bin_dir: PathBuf,

    /// Full path of the launcher script.
    pub launcher_path: PathBuf,

    /// Package manager install prefixes, most preferred first.
    pub manager_prefixes: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// Resolve `config` against `home`, with an optional destination override.
    pub fn resolve(
        config: ProvisionConfig,
        home: &Path,
        arch: Arch,
        project_dir: Option<PathBuf>,
    ) -> Self {
        let destination = project_dir
            .map(|p| expand_home_path(&p, home))
            .unwrap_or_else(|| expand_home(&config.repository.destination, home));
        let bin_dir = expand_home(&config.launcher.bin_dir, home);
        let launcher_path = bin_dir.join(&config.launcher.command_name);
        let manager_prefixes = manager_prefixes(&config, home, &arch);

        Self {
            config,
            home: home.to_path_buf(),
            arch,
            destination,
            bin_dir,
            launcher_path,
            manager_prefixes,
        }
    }

    /// Expand a configured path against the operator's home.
    pub fn expand(&self, raw: &str) -> PathBuf {
        expand_home(raw, &self.home)
    }
}

/// Expand a leading `~` or `~/` against `home`.
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    expand_home_path(Path::new(raw), home)
}

/// [`expand_home`] on path components, so non-UTF-8 paths pass through
/// byte for byte.
pub fn expand_home_path(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home.to_path_buf(),
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// User-writable clone directories come first so a home-directory install
/// wins over a stale system one; then architecture-preferred prefixes; then
/// the rest.
fn manager_prefixes(config: &ProvisionConfig, home: &Path, arch: &Arch) -> Vec<PathBuf> {
    let pm = &config.package_manager;
    let clone_dirs = pm.methods.iter().filter_map(|m| match m {
        MethodConfig::Clone { destination, .. } => Some(destination.as_str()),
        MethodConfig::Script { .. } => None,
    });
    let arch_specific = pm
        .arch_prefixes
        .get(arch.as_str())
        .into_iter()
        .flatten()
        .map(String::as_str);
    let general = pm.prefixes.iter().map(String::as_str);

    let mut prefixes: Vec<PathBuf> = Vec::new();
    for raw in clone_dirs.chain(arch_specific).chain(general) {
        let path = expand_home(raw, home);
        if !prefixes.contains(&path) {
            prefixes.push(path);
        }
    }
    prefixes
}
