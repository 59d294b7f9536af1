//! Environment snapshot and the overlay layer derived from it.

use crate::tree::{DELIMITER, split_path};
use crate::{ConfigError, ConfigTree, Scalar};
use log::debug;
use std::collections::BTreeMap;

/// Variable selecting which environment-specific config files apply.
pub const CONFIG_ENV_VAR: &str = "CONFIG_ENV";

/// An immutable copy of environment variables taken once per resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Snapshot the current process environment. Non-UTF-8 entries are skipped.
    pub fn capture() -> Self {
        let mut vars = BTreeMap::new();
        for (name, value) in std::env::vars_os() {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    vars.insert(name, value);
                }
                (name, _) => debug!("skipping non UTF-8 environment variable: {name:?}"),
            }
        }
        Self { vars }
    }

    /// Build a snapshot from explicit name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Value of one variable, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Number of captured variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when no variables were captured.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Value of [`CONFIG_ENV_VAR`], treating an empty value as unset.
    ///
    /// The value is spliced into a file name, so path separators are rejected.
    pub fn selector(&self) -> Result<Option<&str>, ConfigError> {
        let Some(selector) = self.get(CONFIG_ENV_VAR) else {
            return Ok(None);
        };
        if selector.is_empty() {
            return Ok(None);
        }
        if selector.trim().is_empty()
            || selector.contains(['/', '\\'])
            || selector.contains("..")
        {
            return Err(ConfigError::InvalidUsage(format!(
                "{CONFIG_ENV_VAR} must name an environment, got {selector:?}"
            )));
        }
        Ok(Some(selector))
    }

    /// Convert every variable into a string leaf at its transformed key path.
    ///
    /// Variables are applied in name order; one whose path collides in shape
    /// with an earlier variable (`TERM` and `TERM_PROGRAM`) is dropped.
    pub fn overlay(&self) -> ConfigTree {
        let mut tree = ConfigTree::new();
        for (name, value) in &self.vars {
            let path = env_key_path(name);
            if split_path(&path).is_none() {
                debug!("skipping environment variable with empty key segment: {name}");
                continue;
            }
            if let Err(err) = tree.insert_path(&path, Scalar::Str(value.clone())) {
                debug!("skipping environment variable {name}: {err}");
            }
        }
        tree
    }
}

/// Map an environment variable name to a config key path: `SERVER_ADDRESS`
/// becomes `server.address`.
pub fn env_key_path(name: &str) -> String {
    name.to_lowercase().replace('_', &DELIMITER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn transforms_names_to_paths() {
        assert_eq!(env_key_path("SERVER_ADDRESS"), "server.address");
        assert_eq!(env_key_path("Google_Project"), "google.project");
        assert_eq!(env_key_path("PATH"), "path");
    }

    #[test]
    fn overlay_contains_every_variable() {
        let env = EnvSnapshot::from_pairs([
            ("SERVER_ADDRESS", ":env"),
            ("HOME", "/home/test"),
            ("UNRELATED_THING", "x"),
        ]);
        let tree = env.overlay();
        assert_eq!(tree.get_path("server.address"), Some(&ConfigValue::from(":env")));
        assert_eq!(tree.get_path("home"), Some(&ConfigValue::from("/home/test")));
        assert_eq!(tree.get_path("unrelated.thing"), Some(&ConfigValue::from("x")));
    }

    #[test]
    fn overlay_drops_colliding_variables() {
        let env = EnvSnapshot::from_pairs([
            ("TERM", "xterm"),
            ("TERM_PROGRAM", "tmux"),
            ("_", "/usr/bin/env"),
        ]);
        let tree = env.overlay();
        assert_eq!(tree.get_path("term"), Some(&ConfigValue::from("xterm")));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn selector_treats_empty_as_unset() {
        let env = EnvSnapshot::from_pairs([(CONFIG_ENV_VAR, "")]);
        assert_eq!(env.selector().expect("selector"), None);
        let env = EnvSnapshot::default();
        assert_eq!(env.selector().expect("selector"), None);
        let env = EnvSnapshot::from_pairs([(CONFIG_ENV_VAR, "prod")]);
        assert_eq!(env.selector().expect("selector"), Some("prod"));
    }

    #[test]
    fn selector_rejects_paths() {
        for value in ["../prod", "a/b", " ", "a\\b"] {
            let env = EnvSnapshot::from_pairs([(CONFIG_ENV_VAR, value)]);
            assert!(matches!(
                env.selector(),
                Err(ConfigError::InvalidUsage(_))
            ));
        }
    }

    #[test]
    fn capture_reads_process_environment() {
        let env = EnvSnapshot::capture();
        assert_eq!(env.get("CARGO_PKG_NAME"), Some("keystone-rs-config"));
    }
}
