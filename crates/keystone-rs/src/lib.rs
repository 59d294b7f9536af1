//! Public surface for keystone services.
//!
//! This crate re-exports the config resolution engine and provides the
//! process initialization context that wires logging from resolved config.

mod init;
mod logging;

/// Re-export for convenience.
pub use keystone_rs_config as config;

pub use init::{InitContext, InitError};
pub use logging::level_filter;
