//! Tracing subscriber initialisation.
//!
//! The matching engine only emits `tracing` events; binaries and test
//! harnesses embedding it decide where those events go by calling
//! [`init_tracing`] once at startup.

use crate::ToolkitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Component name recorded on the startup event
    pub component: String,
    /// Log level filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
    /// Whether to include the event target (module path)
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            component: "contract-matcher".to_string(),
            log_level: "info".to_string(),
            json_output: false,
            with_target: true,
        }
    }
}

impl TracingConfig {
    /// Create config with custom component name.
    #[must_use]
    pub fn with_component(mut self, name: impl Into<String>) -> Self {
        self.component = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }

    /// Omit event targets from the output.
    #[must_use]
    pub const fn without_target(mut self) -> Self {
        self.with_target = false;
        self
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns [`ToolkitError::InvalidConfig`] if the log level is not a valid
/// filter directive, or [`ToolkitError::Internal`] if a global subscriber was
/// already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), ToolkitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| ToolkitError::invalid_config("log_level", e.to_string()))?,
    };

    let result = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(config.with_target))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init()
    };
    result.map_err(|e| ToolkitError::internal(e.to_string()))?;

    tracing::info!(component = %config.component, "Tracing initialised");
    Ok(())
}
