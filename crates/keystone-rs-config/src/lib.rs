//! Layered configuration resolution for keystone services.
//!
//! This crate owns the config tree model, the strict layer merge, the
//! environment overlay and a serde decoder with weak scalar typing, plus
//! the standard [`Common`] config blocks shared by every service.

mod decode;
mod env;
mod error;
mod fs;
mod loader;
mod model;
mod tree;

/// Typed decoding of resolved trees.
pub use decode::{ScalarKind, decode, decode_into};
/// Environment snapshot and overlay conversion.
pub use env::{CONFIG_ENV_VAR, EnvSnapshot, env_key_path};
/// Public error types returned by resolution and decoding.
pub use error::{ConfigError, Shape};
/// Filesystem capabilities for application config files.
pub use fs::{ConfigFs, DirFs, MemoryFs};
/// Layer discovery, merge and load entry points.
pub use loader::{
    BASE_CONFIG_FILE, ConfigLayer, LOCAL_CONFIG_FILE, Layer, LayerSource, LoadOptions,
    NONLOCAL_CONFIG_FILE, Resolution, WORKSPACE_CONFIG_FILE, environment_config_file, load,
    load_with_options, merge_layers, resolve_layers,
};
/// Standard config blocks.
pub use model::{Common, Google, Logging, Server};
/// Config tree model.
pub use tree::{ConfigTree, ConfigValue, DELIMITER, Scalar};
