//! Layered configuration resolution.
//!
//! Collects layers from embedded defaults, the workspace root, the
//! application's files and the environment, folds them with a strict merge,
//! and decodes the result into a caller-owned config struct.

mod layer_io;
mod merge;
mod utils;


pub use merge::merge_layers;

use crate::fs::{ConfigFs, DirFs};
use crate::{ConfigError, ConfigTree, EnvSnapshot, decode_into};
use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::PathBuf;

/// Application base config file.
pub const BASE_CONFIG_FILE: &str = "config.yaml";
/// Applied only when no environment is selected (local development).
pub const LOCAL_CONFIG_FILE: &str = "config-local.yaml";
/// Applied whenever an environment is selected, before the environment file.
pub const NONLOCAL_CONFIG_FILE: &str = "config-nonlocal.yaml";
/// Shared override file at the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".keystone.yaml";
/// Marker files that identify the workspace root.
const DEFAULT_WORKSPACE_MARKERS: &[&str] = &["Cargo.lock"];

/// Name of the config file for a selected environment.
pub fn environment_config_file(selector: &str) -> String {
    format!("config-{selector}.yaml")
}

/// Origin of a config layer, in merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSource {
    /// Defaults compiled into this crate.
    Defaults,
    /// Override file at the workspace root.
    Workspace,
    /// Application base file.
    Base,
    /// Local development file.
    Local,
    /// File shared by all selected environments.
    NonLocal,
    /// File for the selected environment.
    Environment,
    /// Process environment variables (highest precedence).
    EnvOverlay,
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerSource::Defaults => "defaults",
            LayerSource::Workspace => "workspace",
            LayerSource::Base => "base",
            LayerSource::Local => "local",
            LayerSource::NonLocal => "nonlocal",
            LayerSource::Environment => "environment",
            LayerSource::EnvOverlay => "env",
        };
        f.write_str(name)
    }
}

/// Metadata about a layer that took part in resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Where the layer came from.
    pub source: LayerSource,
    /// File name, or a fixed label for non-file layers.
    pub name: String,
}

/// One parsed source, consumed by [`merge_layers`].
#[derive(Debug, Clone)]
pub struct Layer {
    /// Origin, reported in logs and in [`Resolution`].
    pub meta: ConfigLayer,
    /// Parsed contents.
    pub tree: ConfigTree,
}

/// Summary of a completed resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Layers that were merged, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
}

/// Inputs to a resolution that normally come from the process.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory the workspace root search starts from.
    pub cwd: PathBuf,
    /// Environment snapshot used for the selector and the overlay.
    pub env: EnvSnapshot,
    /// Marker files identifying the workspace root.
    pub workspace_markers: Vec<String>,
    /// Override file name read from the workspace root.
    pub workspace_file: String,
}

impl LoadOptions {
    /// Options for an explicit directory and environment.
    pub fn new(cwd: impl Into<PathBuf>, env: EnvSnapshot) -> Self {
        Self {
            cwd: cwd.into(),
            env,
            workspace_markers: DEFAULT_WORKSPACE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            workspace_file: WORKSPACE_CONFIG_FILE.to_string(),
        }
    }

    /// Current directory and a snapshot of the current environment.
    pub fn from_process() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(cwd, EnvSnapshot::capture())
    }

    /// Replace the workspace root markers.
    pub fn with_workspace_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workspace_markers = markers.into_iter().map(Into::into).collect();
        self
    }
}

/// Resolve config into `conf` using the current directory and environment.
///
/// Sources are merged in order:
///
///  1. Defaults embedded in this crate.
///  2. `.keystone.yaml` at the workspace root (next to `Cargo.lock`), if present.
///  3. `config.yaml` in `files`, if present.
///  4. `config-local.yaml` in `files`, if present and `CONFIG_ENV` is unset.
///  5. `config-nonlocal.yaml` in `files`, if present and `CONFIG_ENV` is set.
///  6. `config-${CONFIG_ENV}.yaml` in `files`, if present and `CONFIG_ENV` is set.
///  7. Environment variables, lowercased with `_` mapped to `.`.
///
/// Steps 3 to 6 are skipped when `files` is `None`. Values already held by
/// `conf` sit below all of them and survive wherever no layer sets the key.
pub fn load<C: Serialize + DeserializeOwned>(
    conf: &mut C,
    files: Option<&dyn ConfigFs>,
) -> Result<Resolution, ConfigError> {
    load_with_options(conf, files, &LoadOptions::from_process())
}

/// Resolve config into `conf` with explicit options.
pub fn load_with_options<C: Serialize + DeserializeOwned>(
    conf: &mut C,
    files: Option<&dyn ConfigFs>,
    options: &LoadOptions,
) -> Result<Resolution, ConfigError> {
    let layers = resolve_layers(files, options)?;
    let metas: Vec<ConfigLayer> = layers.iter().map(|layer| layer.meta.clone()).collect();
    let merged = merge_layers(layers)?;
    decode_into(merged, conf)?;
    info!("config resolved (layers={})", metas.len());
    Ok(Resolution { layers: metas })
}

/// Collect every present layer in merge order, ending with the env overlay.
pub fn resolve_layers(
    files: Option<&dyn ConfigFs>,
    options: &LoadOptions,
) -> Result<Vec<Layer>, ConfigError> {
    let mut layers = vec![layer_io::defaults_layer()];

    let cwd = utils::normalize_path(&options.cwd);
    match utils::find_workspace_root(&cwd, &options.workspace_markers) {
        Some(root) => {
            debug!("resolved workspace root: {}", root.display());
            let root_files = DirFs::new(root);
            layers.extend(layer_io::load_if_present(
                &root_files,
                LayerSource::Workspace,
                &options.workspace_file,
            )?);
        }
        None => debug!("workspace root not found; skipping workspace layer"),
    }

    if let Some(files) = files {
        layers.extend(layer_io::load_if_present(
            files,
            LayerSource::Base,
            BASE_CONFIG_FILE,
        )?);
        match options.env.selector()? {
            None => {
                layers.extend(layer_io::load_if_present(
                    files,
                    LayerSource::Local,
                    LOCAL_CONFIG_FILE,
                )?);
            }
            Some(selector) => {
                debug!("config environment selected: {selector}");
                layers.extend(layer_io::load_if_present(
                    files,
                    LayerSource::NonLocal,
                    NONLOCAL_CONFIG_FILE,
                )?);
                layers.extend(layer_io::load_if_present(
                    files,
                    LayerSource::Environment,
                    &environment_config_file(selector),
                )?);
            }
        }
    } else {
        debug!("no config files provided; skipping application layers");
    }

    layers.push(layer_io::env_layer(&options.env));
    Ok(layers)
}
