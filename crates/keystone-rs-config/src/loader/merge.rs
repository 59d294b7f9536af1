//! Strict deep merge of config layers.

use super::Layer;
use crate::tree::join_path;
use crate::{ConfigError, ConfigTree, ConfigValue};
use log::{debug, warn};

impl ConfigTree {
    /// Merge `overlay` into this tree; later values win for scalars.
    ///
    /// Maps merge recursively. A map meeting a non-map at the same path fails
    /// with [`ConfigError::MergeConflict`] and leaves this tree untouched.
    /// An incoming null never replaces an existing value.
    pub fn merge(&mut self, overlay: ConfigTree) -> Result<(), ConfigError> {
        check_conflicts(self, &overlay, "")?;
        apply(self, overlay);
        Ok(())
    }
}

/// Fold layers left to right into a single tree.
pub fn merge_layers(layers: impl IntoIterator<Item = Layer>) -> Result<ConfigTree, ConfigError> {
    let mut merged = ConfigTree::new();
    for layer in layers {
        let Layer { meta, tree } = layer;
        let keys = tree.len();
        merged.merge(tree).inspect_err(|err| {
            warn!(
                "config layer rejected (source={}, name={}, error={})",
                meta.source, meta.name, err
            );
        })?;
        debug!(
            "merged layer (source={}, name={}, keys={})",
            meta.source, meta.name, keys
        );
    }
    Ok(merged)
}

fn check_conflicts(
    base: &ConfigTree,
    overlay: &ConfigTree,
    prefix: &str,
) -> Result<(), ConfigError> {
    for (key, incoming) in &overlay.entries {
        let Some(existing) = base.entries.get(key) else {
            continue;
        };
        if incoming.is_null() {
            continue;
        }
        let path = join_path(prefix, key);
        match (existing, incoming) {
            (ConfigValue::Map(existing), ConfigValue::Map(incoming)) => {
                check_conflicts(existing, incoming, &path)?;
            }
            (ConfigValue::Map(_), _) | (_, ConfigValue::Map(_)) if !existing.is_null() => {
                return Err(ConfigError::MergeConflict {
                    path,
                    existing: existing.shape(),
                    incoming: incoming.shape(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn apply(base: &mut ConfigTree, overlay: ConfigTree) {
    for (key, incoming) in overlay.entries {
        match base.entries.get_mut(&key) {
            None => {
                base.entries.insert(key, incoming);
            }
            Some(_) if incoming.is_null() => {}
            Some(ConfigValue::Map(existing)) => {
                if let ConfigValue::Map(incoming) = incoming {
                    apply(existing, incoming);
                }
            }
            Some(slot) => *slot = incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scalar, Shape};
    use pretty_assertions::assert_eq;

    fn tree(yaml: &str) -> ConfigTree {
        ConfigTree::from_yaml_slice(yaml.as_bytes(), "test").expect("yaml")
    }

    #[test]
    fn later_scalar_wins() {
        let mut base = tree("server:\n  address: \":a\"\n  name: keep\n");
        base.merge(tree("server:\n  address: \":b\"\n")).expect("merge");
        assert_eq!(base.get_path("server.address"), Some(&ConfigValue::from(":b")));
        assert_eq!(base.get_path("server.name"), Some(&ConfigValue::from("keep")));
    }

    #[test]
    fn scalars_of_different_types_replace_each_other() {
        let mut base = tree("logging:\n  json: false\n");
        base.merge(tree("logging:\n  json: \"true\"\n")).expect("merge");
        assert_eq!(base.get_path("logging.json"), Some(&ConfigValue::from("true")));
    }

    #[test]
    fn merging_same_layer_twice_is_idempotent() {
        let layer = tree("a:\n  b: 1\n  c:\n    d: [1, 2]\n");
        let mut once = ConfigTree::new();
        once.merge(layer.clone()).expect("merge");
        let mut twice = once.clone();
        twice.merge(layer).expect("merge");
        assert_eq!(once, twice);
    }

    #[test]
    fn scalar_then_map_conflicts_at_scalar_path() {
        let mut base = tree("a:\n  b: 1\n");
        let err = base.merge(tree("a:\n  b:\n    c: 2\n")).unwrap_err();
        match err {
            ConfigError::MergeConflict {
                path,
                existing,
                incoming,
            } => {
                assert_eq!(path, "a.b");
                assert_eq!(existing, Shape::Scalar);
                assert_eq!(incoming, Shape::Map);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn map_then_scalar_conflicts() {
        let mut base = tree("a:\n  b:\n    c: 2\n");
        let err = base.insert_path("a.b", "flat").unwrap_err();
        assert!(matches!(err, ConfigError::MergeConflict { ref path, .. } if path == "a.b"));
    }

    #[test]
    fn conflict_leaves_base_untouched() {
        let mut base = tree("x: 1\na:\n  b: 1\n");
        let before = base.clone();
        let err = base.merge(tree("x: 2\na:\n  b:\n    c: 2\n"));
        assert!(err.is_err());
        assert_eq!(base, before);
    }

    #[test]
    fn null_does_not_override() {
        let mut base = tree("a:\n  b: 1\n  c:\n    d: 2\n");
        base.merge(tree("a:\n  b: ~\n  c: ~\n")).expect("merge");
        assert_eq!(base.get_path("a.b"), Some(&ConfigValue::from(1_i64)));
        assert_eq!(base.get_path("a.c.d"), Some(&ConfigValue::from(2_i64)));
    }

    #[test]
    fn value_replaces_null() {
        let mut base = tree("a: ~\n");
        base.merge(tree("a:\n  b: 1\n")).expect("merge");
        assert_eq!(base.get_path("a.b"), Some(&ConfigValue::from(1_i64)));
        assert_eq!(
            tree("a: ~\n").get("a"),
            Some(&ConfigValue::Scalar(Scalar::Null))
        );
    }

    #[test]
    fn lists_replace_wholesale() {
        let mut base = tree("hosts: [a, b, c]\n");
        base.merge(tree("hosts: [d]\n")).expect("merge");
        assert_eq!(
            base.get("hosts"),
            Some(&ConfigValue::List(vec![ConfigValue::from("d")]))
        );
    }
}
