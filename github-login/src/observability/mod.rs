//! Observability (logging, tracing)
//!
//! Structured logging via `tracing`: pretty output in debug builds, JSON in
//! release builds, filtered by `RUST_LOG`.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber
///
/// # Errors
///
/// Returns [`TryInitError`] if a global subscriber is already installed
///
/// # Example
///
/// ```rust,no_run
/// use github_login::observability::{self, ObservabilityConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// observability::init(&ObservabilityConfig::default())?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    }

    tracing::debug!(service = %config.service_name, "Observability initialized");
    Ok(())
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name for logs
    pub service_name: String,

    /// Filter used when `RUST_LOG` is unset
    pub filter: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            filter: None,
        }
    }
}

impl ObservabilityConfig {
    /// Create new observability config
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Override the default filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Filter directives applied when `RUST_LOG` is unset
    #[must_use]
    pub fn default_filter(&self) -> String {
        self.filter.clone().unwrap_or_else(|| {
            if cfg!(debug_assertions) {
                "info,github_login=debug,tower_http=debug".to_string()
            } else {
                "info".to_string()
            }
        })
    }
}
