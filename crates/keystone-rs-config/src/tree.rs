//! Config tree values and YAML conversion.

use crate::{ConfigError, Shape};
use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Separator between segments of a dotted key path.
pub const DELIMITER: char = '.';

/// A leaf value in a config tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit YAML null; treated as "not specified" by merge and decode.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer that fits in an `i64`.
    Int(i64),
    /// Integer above `i64::MAX`, kept exact for `u64` fields.
    Uint(u64),
    /// Floating point value.
    Float(f64),
    /// Text; environment variables always arrive as text.
    Str(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Uint(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// A value stored at one key of a config tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A leaf value.
    Scalar(Scalar),
    /// A sequence; merged as a unit.
    List(Vec<ConfigValue>),
    /// A nested table of keys.
    Map(ConfigTree),
}

impl ConfigValue {
    /// Shape used by the strict merge to detect conflicts.
    pub fn shape(&self) -> Shape {
        match self {
            ConfigValue::Scalar(_) => Shape::Scalar,
            ConfigValue::List(_) => Shape::List,
            ConfigValue::Map(_) => Shape::Map,
        }
    }

    /// The leaf value, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ConfigValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// The nested tree, if this is a map.
    pub fn as_map(&self) -> Option<&ConfigTree> {
        match self {
            ConfigValue::Map(tree) => Some(tree),
            _ => None,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Scalar(Scalar::Null))
    }

    /// Short rendering used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            ConfigValue::Scalar(scalar) => scalar.to_string(),
            ConfigValue::List(items) => format!("<list of {}>", items.len()),
            ConfigValue::Map(tree) => format!("<map of {}>", tree.len()),
        }
    }
}

impl From<Scalar> for ConfigValue {
    fn from(value: Scalar) -> Self {
        ConfigValue::Scalar(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Scalar(Scalar::Str(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Scalar(Scalar::Float(value))
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(value: ConfigTree) -> Self {
        ConfigValue::Map(value)
    }
}

/// Insertion-ordered map of keys to values; nested maps form dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    pub(crate) entries: IndexMap<String, ConfigValue>,
}

impl ConfigTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the tree has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-level keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Look up a single top-level key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Look up a dotted key path such as `server.address`.
    pub fn get_path(&self, path: &str) -> Option<&ConfigValue> {
        let mut segments = path.split(DELIMITER);
        let first = segments.next()?;
        let mut current = self.entries.get(first)?;
        for segment in segments {
            current = current.as_map()?.entries.get(segment)?;
        }
        Some(current)
    }

    /// Set a dotted key path, creating intermediate maps.
    ///
    /// Uses the same strict rules as layer merging, so a path that crosses an
    /// existing scalar fails with [`ConfigError::MergeConflict`].
    pub fn insert_path(
        &mut self,
        path: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<(), ConfigError> {
        let segments = split_path(path).ok_or_else(|| {
            ConfigError::InvalidUsage(format!("invalid config key path {path:?}"))
        })?;
        self.merge(nest(&segments, value.into()))
    }

    /// Parse YAML bytes into a tree. `name` identifies the source in errors.
    ///
    /// Dotted keys expand into nested maps. Setting the same path twice in
    /// one document, for example as `server.address` and again under
    /// `server:`, is a [`ConfigError::Parse`].
    pub fn from_yaml_slice(bytes: &[u8], name: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_slice(bytes).map_err(|err| ConfigError::parse(name, err))?;
        match value {
            Value::Null => Ok(Self::new()),
            Value::Mapping(mapping) => {
                tree_from_mapping(mapping).map_err(|message| ConfigError::parse(name, message))
            }
            other => Err(ConfigError::parse(
                name,
                format!("expected a mapping at the top level, found {}", yaml_kind(&other)),
            )),
        }
    }
}

/// Split a dotted path into segments, rejecting empty segments.
pub(crate) fn split_path(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split(DELIMITER).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{DELIMITER}{key}")
    }
}

/// Wrap `value` in one map per leading segment.
fn nest(segments: &[&str], value: ConfigValue) -> ConfigTree {
    let mut value = value;
    for segment in segments.iter().skip(1).rev() {
        let mut tree = ConfigTree::new();
        tree.entries.insert((*segment).to_string(), value);
        value = ConfigValue::Map(tree);
    }
    let mut root = ConfigTree::new();
    if let Some(first) = segments.first() {
        root.entries.insert((*first).to_string(), value);
    }
    root
}

fn tree_from_mapping(mapping: Mapping) -> Result<ConfigTree, String> {
    let mut tree = ConfigTree::new();
    for (key, value) in mapping {
        let key = yaml_key(key)?;
        let segments = split_path(&key).ok_or_else(|| format!("invalid key {key:?}"))?;
        let incoming = nest(&segments, value_from_yaml(value)?);
        if let Some(path) = first_shared_path(&tree, &incoming, "") {
            return Err(format!("duplicate key {path}"));
        }
        tree.merge(incoming).map_err(|err| err.to_string())?;
    }
    Ok(tree)
}

/// First path set in both trees. Maps present in both are descended.
fn first_shared_path(tree: &ConfigTree, incoming: &ConfigTree, prefix: &str) -> Option<String> {
    incoming.entries.iter().find_map(|(key, value)| {
        let existing = tree.entries.get(key)?;
        let path = join_path(prefix, key);
        match (existing, value) {
            (ConfigValue::Map(existing), ConfigValue::Map(value)) => {
                first_shared_path(existing, value, &path)
            }
            _ => Some(path),
        }
    })
}

fn value_from_yaml(value: Value) -> Result<ConfigValue, String> {
    let value = match value {
        Value::Null => Scalar::Null.into(),
        Value::Bool(value) => Scalar::Bool(value).into(),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Scalar::Int(value).into()
            } else if let Some(value) = number.as_u64() {
                Scalar::Uint(value).into()
            } else {
                number
                    .as_f64()
                    .map(|value| Scalar::Float(value).into())
                    .ok_or_else(|| format!("unsupported number {number}"))?
            }
        }
        Value::String(value) => Scalar::Str(value).into(),
        Value::Sequence(items) => ConfigValue::List(
            items
                .into_iter()
                .map(value_from_yaml)
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(mapping) => ConfigValue::Map(tree_from_mapping(mapping)?),
        Value::Tagged(tagged) => value_from_yaml(tagged.value)?,
    };
    Ok(value)
}

fn yaml_key(key: Value) -> Result<String, String> {
    match key {
        Value::String(key) => Ok(key),
        Value::Bool(key) => Ok(key.to_string()),
        Value::Number(key) => Ok(key.to_string()),
        other => Err(format!("unsupported {} used as a key", yaml_kind(&other))),
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_yaml() {
        let yaml = b"server:\n  address: \":9090\"\nlogging:\n  json: true\n  level: debug\n";
        let tree = ConfigTree::from_yaml_slice(yaml, "test").expect("tree");
        assert_eq!(
            tree.get_path("server.address"),
            Some(&ConfigValue::from(":9090"))
        );
        assert_eq!(tree.get_path("logging.json"), Some(&ConfigValue::from(true)));
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["server", "logging"]);
    }

    #[test]
    fn expands_dotted_keys_in_files() {
        let yaml = b"server.address: \":1\"\nserver:\n  port: 8\n";
        let tree = ConfigTree::from_yaml_slice(yaml, "test").expect("tree");
        assert_eq!(tree.get_path("server.address"), Some(&ConfigValue::from(":1")));
        assert_eq!(tree.get_path("server.port"), Some(&ConfigValue::from(8_i64)));
    }

    #[test]
    fn same_path_set_twice_in_one_file_is_parse_error() {
        let yaml = b"server.address: \":dotted\"\nserver:\n  address: \":nested\"\n";
        let err = ConfigTree::from_yaml_slice(yaml, "config.yaml").unwrap_err();
        match err {
            ConfigError::Parse { name, message } => {
                assert_eq!(name, "config.yaml");
                assert!(message.contains("duplicate key server.address"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let yaml = b"server:\n  address: \":nested\"\nserver.address: \":dotted\"\n";
        assert!(ConfigTree::from_yaml_slice(yaml, "config.yaml").is_err());
    }

    #[test]
    fn dotted_key_over_nested_map_is_parse_error() {
        let yaml = b"a.b: 1\na:\n  b:\n    c: 2\n";
        let err = ConfigTree::from_yaml_slice(yaml, "nested.yaml").unwrap_err();
        assert!(err.to_string().contains("duplicate key a.b"), "{err}");
    }

    #[test]
    fn keeps_integers_above_i64_max() {
        let tree = ConfigTree::from_yaml_slice(b"n: 18446744073709551615\n", "big").expect("tree");
        assert_eq!(
            tree.get("n"),
            Some(&ConfigValue::Scalar(Scalar::Uint(u64::MAX)))
        );
    }

    #[test]
    fn empty_document_is_empty_tree() {
        let tree = ConfigTree::from_yaml_slice(b"", "empty").expect("tree");
        assert!(tree.is_empty());
    }

    #[test]
    fn rejects_non_mapping_document() {
        let err = ConfigTree::from_yaml_slice(b"- a\n- b\n", "list.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref name, .. } if name == "list.yaml"));
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = ConfigTree::from_yaml_slice(b"server: [unclosed", "bad.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref name, .. } if name == "bad.yaml"));
    }

    #[test]
    fn insert_path_rejects_empty_segments() {
        let mut tree = ConfigTree::new();
        let err = tree.insert_path("a..b", "x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUsage(_)));
    }

    #[test]
    fn get_path_stops_at_scalars() {
        let mut tree = ConfigTree::new();
        tree.insert_path("a.b", 1_i64).expect("insert");
        assert_eq!(tree.get_path("a.b.c"), None);
        assert_eq!(tree.get_path("a").map(ConfigValue::shape), Some(Shape::Map));
    }
}
