//! Configuration schema.
//!
//! Package names, URLs and directory names are data, not logic: they all
//! live here so two configurations of the same provisioning flow (say, a
//! bootstrap-script install of Python 3.11 versus a home-directory clone
//! with Python 3.12) differ only in YAML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root provisioning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisionConfig {
    /// Display name of the application being provisioned.
    pub app_name: String,

    /// Where the application source comes from and where it lands.
    pub repository: RepositoryConfig,

    /// Version-control tool required by clone-based methods.
    pub version_control: VersionControlConfig,

    /// The package manager used to install the runtime.
    pub package_manager: PackageManagerConfig,

    /// The language runtime the application runs on.
    pub runtime: RuntimeConfig,

    /// The runtime's own package installer.
    pub package_installer: PackageInstallerConfig,

    /// The persistent command wrapper.
    pub launcher: LauncherConfig,
}

/// Application repository settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Version-control URL (cloned first).
    pub url: String,

    /// Immutable archive of the same revision (fallback).
    pub archive_url: String,

    /// Default destination; `PROJECT_DIR` overrides it.
    pub destination: String,

    /// Wall-clock limit for the clone, in seconds.
    #[serde(default)]
    pub clone_timeout_secs: Option<u64>,

    /// Wall-clock limit for completing history after a shallow clone.
    #[serde(default)]
    pub history_timeout_secs: Option<u64>,

    /// Conventional entry-point file names, in preference order.
    #[serde(default)]
    pub entry_points: Vec<String>,

    /// Dependency manifest, relative to the project directory.
    pub requirements_file: String,
}

/// Version-control tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionControlConfig {
    pub name: String,
    pub binary: String,
    pub install_hint: String,
}

/// Package manager settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManagerConfig {
    pub name: String,

    /// Executable name, looked up as `<prefix>/bin/<binary>`.
    pub binary: String,

    /// Install prefixes checked on every architecture.
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Install prefixes checked first on a given architecture
    /// (`aarch64`, `x86_64`, ...).
    #[serde(default)]
    pub arch_prefixes: BTreeMap<String, Vec<String>>,

    /// Whether to offer a self-update once the manager is present.
    #[serde(default)]
    pub update: bool,

    /// Ordered install strategies.
    pub methods: Vec<MethodConfig>,

    pub install_hint: String,
    /// Wall-clock limit for each install command, in seconds.
    #[serde(default)]
    pub install_timeout_secs: Option<u64>,
}

/// One install strategy for the package manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MethodConfig {
    /// Download an installer script and run it with bash.
    Script { url: String },

    /// Clone the manager's source into a user-writable directory.
    Clone {
        url: String,
        destination: String,
        #[serde(default = "default_true")]
        shallow: bool,
    },
}

/// Language runtime settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    pub name: String,

    /// Versioned executable name (e.g. `python3.11`).
    pub binary: String,

    /// Exact major.minor the reported version must start with.
    pub version: String,

    /// Version-pinned package name for the package manager.
    pub package: String,

    /// Libraries installed before the runtime package.
    #[serde(default)]
    pub prerequisites: Vec<String>,

    pub install_hint: String,
    /// Wall-clock limit for each install command, in seconds.
    #[serde(default)]
    pub install_timeout_secs: Option<u64>,
}

/// Runtime package installer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageInstallerConfig {
    pub name: String,

    /// Module run as `<runtime> -m <module>`.
    pub module: String,

    /// Module that bootstraps the installer when it is missing.
    pub bootstrap_module: String,
    /// Wall-clock limit for each install command, in seconds.
    #[serde(default)]
    pub install_timeout_secs: Option<u64>,
}

/// Launcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    /// File name of the wrapper script.
    pub command_name: String,

    /// Personal binary directory the wrapper lives in.
    pub bin_dir: String,

    /// Comment line opening the shell-profile block.
    pub marker: String,

    /// Extra variables exported from the shell profile.
    #[serde(default)]
    pub exports: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}
