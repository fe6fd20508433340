//! Overlay merge for YAML configuration values.
//!
//! The embedded defaults form the base; a `GROUNDWORK_CONFIG` file is laid
//! over them.
//!
//! # Merge Rules
//!
//! - Mappings are merged recursively
//! - Sequences are replaced entirely (an overlay's `methods:` list is the
//!   whole install chain, never appended to the default one)
//! - Null values in the overlay delete the key from the base
//! - Scalars in the overlay replace scalars in the base

use serde_yaml::Value;

/// Lay `overlay` over `base`, returning the merged value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }

            Value::Mapping(result)
        }

        // An empty overlay file parses to Null: treat it as "no changes".
        (base, Value::Null) => base.clone(),

        (_, overlay) => overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn overlay_scalar_replaces_default() {
        let base = yaml(
            r#"
runtime:
  version: "3.11"
  package: python@3.11
"#,
        );
        let overlay = yaml(
            r#"
runtime:
  version: "3.12"
"#,
        );

        let result = deep_merge(&base, &overlay);

        assert_eq!(result["runtime"]["version"], "3.12");
        assert_eq!(result["runtime"]["package"], "python@3.11");
    }

    #[test]
    fn method_chain_is_replaced_not_appended() {
        let base = yaml(
            r#"
methods:
  - kind: script
  - kind: clone
"#,
        );
        let overlay = yaml(
            r#"
methods:
  - kind: clone
"#,
        );

        let result = deep_merge(&base, &overlay);
        let methods = result["methods"].as_sequence().unwrap();

        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0]["kind"], "clone");
    }

    #[test]
    fn null_removes_default_value() {
        let base = yaml(
            r#"
launcher:
  exports:
    HOMEBREW_NO_ANALYTICS: "1"
    HOMEBREW_NO_ENV_HINTS: "1"
"#,
        );
        let overlay = yaml(
            r#"
launcher:
  exports:
    HOMEBREW_NO_ANALYTICS: null
"#,
        );

        let result = deep_merge(&base, &overlay);

        assert!(result["launcher"]["exports"]
            .get("HOMEBREW_NO_ANALYTICS")
            .is_none());
        assert_eq!(result["launcher"]["exports"]["HOMEBREW_NO_ENV_HINTS"], "1");
    }

    #[test]
    fn empty_overlay_file_keeps_defaults() {
        let base = yaml("app_name: workbench");
        let overlay = yaml("");

        let result = deep_merge(&base, &overlay);

        assert_eq!(result["app_name"], "workbench");
    }

    #[test]
    fn new_keys_are_inserted() {
        let base = yaml("repository:\n  url: a");
        let overlay = yaml("repository:\n  clone_timeout_secs: 60");

        let result = deep_merge(&base, &overlay);

        assert_eq!(result["repository"]["url"], "a");
        assert_eq!(result["repository"]["clone_timeout_secs"], 60);
    }
}
