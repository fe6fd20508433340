//! Configuration loading.
//!
//! The built-in defaults are compiled into the binary. An optional overlay
//! file named by `GROUNDWORK_CONFIG` is merged over them before the result
//! is parsed into a typed [`ProvisionConfig`].

use crate::config::merger::deep_merge;
use crate::config::schema::ProvisionConfig;
use crate::error::{ProvisionError, Result};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an overlay config file.
pub const CONFIG_ENV: &str = "GROUNDWORK_CONFIG";

/// Environment variable overriding the project destination.
pub const PROJECT_DIR_ENV: &str = "PROJECT_DIR";

const DEFAULTS: &str = include_str!("defaults.yml");
const DEFAULTS_NAME: &str = "<built-in defaults>";

/// Parse the built-in defaults.
pub fn default_config() -> Result<ProvisionConfig> {
    serde_yaml::from_str(DEFAULTS).map_err(|e| ProvisionError::ConfigParseError {
        path: PathBuf::from(DEFAULTS_NAME),
        message: e.to_string(),
    })
}

/// Load the defaults, merged with `overlay` when given.
pub fn load_config(overlay: Option<&Path>) -> Result<ProvisionConfig> {
    let Some(path) = overlay else {
        return default_config();
    };

    let base: Value =
        serde_yaml::from_str(DEFAULTS).map_err(|e| ProvisionError::ConfigParseError {
            path: PathBuf::from(DEFAULTS_NAME),
            message: e.to_string(),
        })?;
    let overlay = load_config_value(path)?;
    let merged = deep_merge(&base, &overlay);

    tracing::debug!("Loaded config overlay from {}", path.display());

    serde_yaml::from_value(merged).map_err(|e| ProvisionError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load the config named by `GROUNDWORK_CONFIG`, or the defaults.
pub fn load_from_env() -> Result<ProvisionConfig> {
    let overlay = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    load_config(overlay.as_deref())
}

/// Load a config file as a raw YAML value (for merging).
pub fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProvisionError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProvisionError::Io(e)
        }
    })?;

    serde_yaml::from_str(&content).map_err(|e| ProvisionError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::MethodConfig;
    use tempfile::TempDir;

    #[test]
    fn defaults_parse() {
        let config = default_config().unwrap();
        assert_eq!(config.package_manager.binary, "brew");
        assert_eq!(config.runtime.version, "3.11");
        assert_eq!(config.package_manager.methods.len(), 2);
        assert!(!config.repository.entry_points.is_empty());
    }

    #[test]
    fn overlay_switches_to_clone_only_and_newer_runtime() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("overlay.yml");
        fs::write(
            &path,
            r#"
package_manager:
  methods:
    - kind: clone
      url: https://github.com/Homebrew/brew
      destination: ~/homebrew
runtime:
  name: Python 3.12
  binary: python3.12
  version: "3.12"
  package: python@3.12
  prerequisites: []
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();

        assert_eq!(config.runtime.version, "3.12");
        assert!(config.runtime.prerequisites.is_empty());
        assert_eq!(config.package_manager.methods.len(), 1);
        assert!(matches!(
            config.package_manager.methods[0],
            MethodConfig::Clone { .. }
        ));
        // Untouched sections keep their defaults
        assert_eq!(config.launcher.bin_dir, "~/bin");
    }

    #[test]
    fn missing_overlay_is_config_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/groundwork.yml")));
        assert!(matches!(result, Err(ProvisionError::ConfigNotFound { .. })));
    }

    #[test]
    fn invalid_overlay_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "runtime: [unclosed").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ProvisionError::ConfigParseError { .. })));
    }

    #[test]
    fn unknown_key_in_overlay_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("typo.yml");
        fs::write(&path, "runtime:\n  verison: '3.12'\n").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ProvisionError::ConfigParseError { .. })));
    }
}
