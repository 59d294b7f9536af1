//! Typed decoding of resolved trees through serde.
//!
//! Destination types derive `Deserialize`. Scalars use weak typing: the
//! deserializer coerces each value to the [`ScalarKind`] its field asks for,
//! so textual values from environment variables decode into booleans and
//! numbers. `#[serde(flatten)]` keeps an embedded struct's keys at the
//! parent's level.

mod coerce;
mod de;

pub use coerce::ScalarKind;

use crate::tree::join_path;
use crate::{ConfigError, ConfigTree, ConfigValue, Scalar};
use de::{DecodeError, ValueDeserializer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Field name reported for errors on the tree as a whole.
const ROOT_FIELD: &str = "<root>";

/// Decode `tree` into a fresh value of `T`.
///
/// Keys the tree lacks fall back to `T`'s serde defaults.
///
/// ```
/// use keystone_rs_config::{ConfigTree, decode};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Http {
///     port: u16,
///     hosts: Vec<String>,
/// }
///
/// let tree = ConfigTree::from_yaml_slice(b"port: \"8080\"\nhosts: a\n", "http.yaml")?;
/// let http: Http = decode(&tree)?;
/// assert_eq!(http.port, 8080);
/// assert_eq!(http.hosts, vec!["a".to_string()]);
/// # Ok::<(), keystone_rs_config::ConfigError>(())
/// ```
pub fn decode<T: DeserializeOwned>(tree: &ConfigTree) -> Result<T, ConfigError> {
    from_value(&ConfigValue::Map(tree.clone()))
}

/// Decode `tree` over the values already held by `conf`.
///
/// `conf` is serialized into the lowest layer, so fields the tree does not
/// set (or sets to null) keep their current values. Scalars are coerced to
/// the kind of the value they replace before decoding, which lets weak
/// typing reach fields of flattened structs too.
pub fn decode_into<T>(tree: ConfigTree, conf: &mut T) -> Result<(), ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let preset = preset_tree(conf)?;
    let mut merged = preset.clone();
    merged.merge(tree)?;
    apply_preset_kinds(&mut merged, &preset, "")?;
    *conf = from_value(&ConfigValue::Map(merged))?;
    Ok(())
}

fn from_value<T: DeserializeOwned>(root: &ConfigValue) -> Result<T, ConfigError> {
    T::deserialize(ValueDeserializer::new(root, String::new())).map_err(into_config_error)
}

fn into_config_error(err: DecodeError) -> ConfigError {
    let field = match err.field {
        Some(field) if !field.is_empty() => field,
        _ => ROOT_FIELD.to_string(),
    };
    ConfigError::Decode {
        field,
        value: err.value,
        message: err.message,
    }
}

/// Serialize `conf` into a tree. Keys bound twice (a parent field and a
/// flattened child field of the same name) are rejected by the YAML reader.
fn preset_tree<T: Serialize>(conf: &T) -> Result<ConfigTree, ConfigError> {
    let yaml = serde_yaml::to_string(conf).map_err(|err| {
        ConfigError::InvalidUsage(format!("config type cannot be serialized: {err}"))
    })?;
    ConfigTree::from_yaml_slice(yaml.as_bytes(), "preset").map_err(|err| {
        ConfigError::InvalidUsage(format!(
            "config type does not serialize to a map of unique keys: {err}"
        ))
    })
}

/// Coerce merged scalars to the kind of the preset value at the same path.
///
/// serde buffers flattened structs before they reach [`ValueDeserializer`],
/// so their fields never ask for a kind; the preset supplies it instead.
fn apply_preset_kinds(
    tree: &mut ConfigTree,
    preset: &ConfigTree,
    prefix: &str,
) -> Result<(), ConfigError> {
    for (key, hint) in &preset.entries {
        let Some(value) = tree.entries.get_mut(key) else {
            continue;
        };
        let path = join_path(prefix, key);
        match hint {
            ConfigValue::Map(hint) => {
                if let ConfigValue::Map(value) = value {
                    apply_preset_kinds(value, hint, &path)?;
                }
            }
            ConfigValue::Scalar(hint) => {
                if let Some(kind) = ScalarKind::of(hint) {
                    coerce_in_place(value, kind, &path)?;
                }
            }
            ConfigValue::List(hints) => {
                let Some(kind) = hints
                    .first()
                    .and_then(ConfigValue::as_scalar)
                    .and_then(ScalarKind::of)
                else {
                    continue;
                };
                if matches!(value, ConfigValue::Scalar(scalar) if *scalar != Scalar::Null) {
                    let lone = std::mem::replace(value, ConfigValue::List(Vec::new()));
                    *value = ConfigValue::List(vec![lone]);
                }
                if let ConfigValue::List(items) = value {
                    for (idx, item) in items.iter_mut().enumerate() {
                        coerce_in_place(item, kind, &format!("{path}[{idx}]"))?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn coerce_in_place(value: &mut ConfigValue, kind: ScalarKind, path: &str) -> Result<(), ConfigError> {
    let ConfigValue::Scalar(scalar) = value else {
        return Ok(());
    };
    if ScalarKind::of(scalar).is_none_or(|current| current == kind) {
        return Ok(());
    }
    let coerced = kind.coerce(scalar).map_err(|message| ConfigError::Decode {
        field: path.to_string(),
        value: scalar.to_string(),
        message,
    })?;
    *scalar = coerced;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Limits {
        max_conns: u16,
        ratio: f64,
        enabled: bool,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Base {
        name: String,
        limits: Limits,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    enum Mode {
        Fast,
        #[default]
        Safe,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct App {
        #[serde(flatten)]
        base: Base,
        tags: Vec<String>,
        ports: Vec<u16>,
        token: Option<String>,
        mode: Mode,
        #[serde(skip)]
        untagged: String,
    }

    fn tree(yaml: &str) -> ConfigTree {
        ConfigTree::from_yaml_slice(yaml.as_bytes(), "test").expect("yaml")
    }

    fn tree_from_scalar(key: &str, value: Scalar) -> ConfigTree {
        let mut tree = ConfigTree::new();
        tree.insert_path(key, value).expect("insert");
        tree
    }

    #[test]
    fn decodes_flattened_and_nested_fields() {
        let tree = tree(
            "name: svc\nlimits:\n  max_conns: 10\n  ratio: 0.5\n  enabled: true\ntags: [a, b]\nports: [80, \"443\"]\ntoken: secret\nmode: fast\nuntagged: ignored\n",
        );
        let mut app = App::default();
        decode_into(tree, &mut app).expect("decode");
        assert_eq!(
            app,
            App {
                base: Base {
                    name: "svc".to_string(),
                    limits: Limits {
                        max_conns: 10,
                        ratio: 0.5,
                        enabled: true,
                    },
                },
                tags: vec!["a".to_string(), "b".to_string()],
                ports: vec![80, 443],
                token: Some("secret".to_string()),
                mode: Mode::Fast,
                untagged: String::new(),
            }
        );
    }

    #[test]
    fn coerces_text_values() {
        let tree = tree("limits:\n  max_conns: \"12\"\n  ratio: \"1.25\"\n  enabled: \"t\"\n");
        let base: Base = decode(&tree).expect("decode");
        assert_eq!(
            base.limits,
            Limits {
                max_conns: 12,
                ratio: 1.25,
                enabled: true,
            }
        );
    }

    #[test]
    fn coerces_text_values_in_flattened_structs() {
        let mut app = App::default();
        let tree = tree("limits:\n  max_conns: \"12\"\n  enabled: \"0\"\n  ratio: \"\"\n");
        decode_into(tree, &mut app).expect("decode");
        assert_eq!(app.base.limits.max_conns, 12);
        assert!(!app.base.limits.enabled);
        assert_eq!(app.base.limits.ratio, 0.0);
    }

    #[test]
    fn coerces_numbers_and_bools_to_text() {
        let mut base = Base::default();
        decode_into(tree("name: 42\n"), &mut base).expect("decode");
        assert_eq!(base.name, "42");

        decode_into(tree_from_scalar("name", Scalar::Bool(true)), &mut base).expect("decode");
        assert_eq!(base.name, "1");
    }

    #[test]
    fn missing_keys_keep_preset_values() {
        let mut base = Base {
            name: "preset".to_string(),
            limits: Limits {
                max_conns: 7,
                ratio: 2.0,
                enabled: true,
            },
        };
        decode_into(tree("limits:\n  ratio: 3.0\n"), &mut base).expect("decode");
        assert_eq!(base.name, "preset");
        assert_eq!(base.limits.max_conns, 7);
        assert_eq!(base.limits.ratio, 3.0);
        assert!(base.limits.enabled);
    }

    #[test]
    fn null_keeps_preset_value() {
        let mut base = Base {
            name: "preset".to_string(),
            ..Base::default()
        };
        decode_into(tree("name: ~\nlimits: ~\n"), &mut base).expect("decode");
        assert_eq!(base.name, "preset");
    }

    #[test]
    fn invalid_bool_names_field_and_value() {
        for err in [
            decode::<Base>(&tree("limits:\n  enabled: maybe\n")).unwrap_err(),
            decode_into(tree("limits:\n  enabled: maybe\n"), &mut Base::default()).unwrap_err(),
        ] {
            match err {
                ConfigError::Decode { field, value, .. } => {
                    assert_eq!(field, "limits.enabled");
                    assert_eq!(value, "\"maybe\"");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn out_of_range_integer_fails() {
        let err = decode::<Base>(&tree("limits:\n  max_conns: 70000\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref field, .. } if field == "limits.max_conns"));
        assert!(err.to_string().contains("expected u16"));
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Counter {
        n: u64,
    }

    #[test]
    fn unsigned_values_above_i64_max_decode() {
        let counter: Counter = decode(&tree("n: 18446744073709551615\n")).expect("decode");
        assert_eq!(counter.n, u64::MAX);

        let mut counter = Counter::default();
        let text = tree_from_scalar("n", Scalar::Str("18446744073709551615".into()));
        decode_into(text, &mut counter).expect("decode");
        assert_eq!(counter.n, u64::MAX);
    }

    #[test]
    fn negative_value_for_unsigned_field_fails() {
        let err = decode::<Counter>(&tree_from_scalar("n", Scalar::Str("-1".into()))).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref field, .. } if field == "n"));
    }

    #[test]
    fn map_for_scalar_field_fails() {
        let err = decode::<Base>(&tree("name:\n  first: a\n")).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref field, .. } if field == "name"));
    }

    #[test]
    fn scalar_for_nested_field_fails() {
        let err = decode::<Base>(&tree("limits: 3\n")).unwrap_err();
        assert!(err.to_string().contains("expected map"));
    }

    #[test]
    fn lone_scalar_lifts_into_list() {
        let mut app = App::default();
        decode_into(tree_from_scalar("ports", Scalar::Str("8080".into())), &mut app)
            .expect("decode");
        assert_eq!(app.ports, vec![8080]);
    }

    #[test]
    fn bad_list_element_names_index() {
        let err = decode_into(tree("ports: [1, nope]\n"), &mut App::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref field, .. } if field == "ports[1]"));
    }

    #[test]
    fn unknown_enum_variant_names_field() {
        let err = decode_into(tree("mode: turbo\n"), &mut App::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Decode { ref field, .. } if field == "mode"));
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Inner {
        name: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Shadowing {
        name: String,
        #[serde(flatten)]
        inner: Inner,
    }

    #[test]
    fn key_bound_by_parent_and_flattened_child_is_invalid_usage() {
        let err = decode_into(tree("name: x\n"), &mut Shadowing::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUsage(_)), "{err}");
    }

    #[test]
    fn non_map_config_type_is_invalid_usage() {
        let mut port = 0_u16;
        let err = decode_into(tree("port: 1\n"), &mut port).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUsage(_)), "{err}");
    }
}
