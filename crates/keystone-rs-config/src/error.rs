//! Error types for config resolution and decoding.

use std::fmt;
use thiserror::Error;

/// Shape of a value in a config tree, as seen by the strict merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single scalar value (string, number, bool or null).
    Scalar,
    /// A sequence of values; merged as a unit like a scalar.
    List,
    /// A nested table of keys.
    Map,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Scalar => "scalar",
            Shape::List => "list",
            Shape::Map => "map",
        };
        f.write_str(name)
    }
}

/// Errors returned while resolving or decoding config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config source exists but could not be read.
    #[error("failed to read config {name}: {source}")]
    SourceRead {
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// A config source is not well-formed YAML.
    #[error("failed to parse config {name}: {message}")]
    Parse { name: String, message: String },
    /// Two layers disagree on the shape of a key path.
    #[error("config conflict at {path}: cannot merge {incoming} over {existing}")]
    MergeConflict {
        path: String,
        existing: Shape,
        incoming: Shape,
    },
    /// A merged value could not be coerced into the destination field.
    #[error("invalid config at {field}: cannot decode {value}: {message}")]
    Decode {
        field: String,
        value: String,
        message: String,
    },
    /// The caller used the API incorrectly.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

impl ConfigError {
    pub(crate) fn source_read(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::SourceRead {
            name: name.into(),
            source,
        }
    }

    pub(crate) fn parse(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
