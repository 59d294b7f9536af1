//! Explicit process initialization state.

use crate::logging;
use keystone_rs_config::Logging;
use log::{debug, info};
use thiserror::Error;

/// Errors returned while initializing process-wide facilities.
#[derive(Debug, Error)]
pub enum InitError {
    /// Another logger was already installed in this process.
    #[error("failed to install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Tracks which process-wide facilities have been initialized.
///
/// Constructed once by the entry point and passed by reference to whatever
/// needs to initialize; repeated initialization through the same context is a
/// no-op.
#[derive(Debug, Default)]
pub struct InitContext {
    logging_initialized: bool,
}

impl InitContext {
    /// A context in which nothing has been initialized yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`InitContext::init_logging`] has installed the logger.
    pub fn logging_initialized(&self) -> bool {
        self.logging_initialized
    }

    /// Install the global logger for `conf`.
    ///
    /// Returns `Ok(true)` when the logger was installed and `Ok(false)` when
    /// this context already did so.
    pub fn init_logging(&mut self, conf: &Logging) -> Result<bool, InitError> {
        if self.logging_initialized {
            debug!("logging already initialized; ignoring");
            return Ok(false);
        }
        logging::builder(conf).try_init()?;
        self.logging_initialized = true;
        info!(
            "logging initialized (level={}, json={})",
            logging::level_filter(&conf.level),
            conf.json
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_initializes_once_per_process() {
        let conf = Logging {
            level: "debug".to_string(),
            json: true,
        };
        let mut context = InitContext::new();
        assert!(!context.logging_initialized());
        assert!(context.init_logging(&conf).expect("init"));
        assert!(context.logging_initialized());
        assert!(!context.init_logging(&conf).expect("repeat init"));

        let mut other = InitContext::new();
        let err = other.init_logging(&conf).unwrap_err();
        assert!(matches!(err, InitError::Logger(_)));
        assert!(!other.logging_initialized());
    }
}
