//! Provisioning configuration.
//!
//! - Schema definitions in [`schema`]
//! - Embedded defaults and overlay loading in [`loader`]
//! - Overlay merge semantics in [`merger`]
//! - Path resolution in [`resolve`]
//!
//! # Example
//!
//! ```
//! use groundwork::config::{default_config, ResolvedConfig};
//! use groundwork::requirements::probe::Arch;
//! use std::path::Path;
//!
//! let config = default_config().unwrap();
//! let resolved = ResolvedConfig::resolve(config, Path::new("/home/me"), Arch::Aarch64, None);
//! assert!(resolved.launcher_path.starts_with("/home/me"));
//! ```

pub mod loader;
pub mod merger;
pub mod resolve;
pub mod schema;

pub use loader::{
    default_config, load_config, load_config_value, load_from_env, CONFIG_ENV, PROJECT_DIR_ENV,
};
pub use merger::deep_merge;
pub use resolve::{expand_home, expand_home_path, ResolvedConfig};
pub use schema::{
    LauncherConfig, MethodConfig, PackageInstallerConfig, PackageManagerConfig, ProvisionConfig,
    RepositoryConfig, RuntimeConfig, VersionControlConfig,
};
