//! IO helpers for reading config layers.

use super::{ConfigLayer, Layer, LayerSource};
use crate::fs::ConfigFs;
use crate::{ConfigError, ConfigTree, EnvSnapshot};
use log::debug;

/// Defaults compiled into the crate.
const DEFAULTS_YAML: &str = include_str!("../defaults.yaml");

/// Parse the embedded defaults.
///
/// # Panics
///
/// Panics if the embedded YAML is malformed, which can only happen through a
/// broken build of this crate.
pub(super) fn defaults_layer() -> Layer {
    let tree = ConfigTree::from_yaml_slice(DEFAULTS_YAML.as_bytes(), "defaults.yaml")
        .unwrap_or_else(|err| panic!("embedded config defaults are malformed: {err}"));
    Layer {
        meta: ConfigLayer {
            source: LayerSource::Defaults,
            name: "defaults.yaml".to_string(),
        },
        tree,
    }
}

/// Load `name` from `files` if it exists.
pub(super) fn load_if_present(
    files: &dyn ConfigFs,
    source: LayerSource,
    name: &str,
) -> Result<Option<Layer>, ConfigError> {
    let label = layer_label(source, name);
    let exists = files
        .exists(name)
        .map_err(|err| ConfigError::source_read(&label, err))?;
    if !exists {
        debug!("optional layer missing (source={source}, name={name})");
        return Ok(None);
    }

    let contents = files
        .read(name)
        .map_err(|err| ConfigError::source_read(&label, err))?;
    let tree = ConfigTree::from_yaml_slice(&contents, &label)?;
    debug!(
        "loaded layer (source={source}, name={name}, keys={})",
        tree.len()
    );
    Ok(Some(Layer {
        meta: ConfigLayer {
            source,
            name: name.to_string(),
        },
        tree,
    }))
}

/// Build the overlay layer from an environment snapshot.
pub(super) fn env_layer(env: &EnvSnapshot) -> Layer {
    let tree = env.overlay();
    debug!(
        "built environment layer (vars={}, keys={})",
        env.len(),
        tree.len()
    );
    Layer {
        meta: ConfigLayer {
            source: LayerSource::EnvOverlay,
            name: "environment".to_string(),
        },
        tree,
    }
}

/// Label identifying a layer in errors, e.g. `base(config.yaml)`.
pub(super) fn layer_label(source: LayerSource, name: &str) -> String {
    format!("{source}({name})")
}
