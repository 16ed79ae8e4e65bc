// permx/src/configs/initializer.rs
use crate::error::PermxError;
use env_logger::Env;
use log::{debug, info};
use std::env;
use std::sync::Once;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermxConfig {
    pub environment: String,
    pub log_level: String,
    /// Where denied routes redirect to.
    pub safe_route: String,
}

impl Default for PermxConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            safe_route: "/".to_string(),
        }
    }
}

impl PermxConfig {
    pub fn from_env() -> Result<Self, PermxError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PermxError> {
        let defaults = Self::default();
        let config = Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            safe_route: lookup("PERMX_SAFE_ROUTE").unwrap_or(defaults.safe_route),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PermxError> {
        if !self.safe_route.starts_with('/') {
            return Err(PermxError::Config(format!(
                "PERMX_SAFE_ROUTE must start with '/', got '{}'",
                self.safe_route
            )));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

static LOGGING: Once = Once::new();

/// Install `env_logger` once per process; later calls are no-ops.
pub fn setup_permx_logging(config: &PermxConfig) {
    LOGGING.call_once(|| {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or(&config.log_level))
            .format_timestamp_millis()
            .try_init();

        info!("permx logging initialized");
        info!("permx environment: {}", config.environment);
        debug!("permx debug logging active");
    });
}
