//! Structured telemetry initialisation for Ext.Direct providers.
//!
//! The configured `log_filter` decides what is emitted. When the provider
//! runs in debug mode the router and transport targets are raised to `debug`
//! as well, so the per-call diagnostics that accompany detailed failure
//! envelopes reach the log without editing the filter.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, info, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt;

use extdirect_config::{Config, LogFormat};

use crate::dispatch::DISPATCH_TARGET;
use crate::transport::TRANSPORT_TARGET;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Only the first successful call installs a subscriber; later calls return
/// a fresh [`TelemetryHandle`] without touching global state.
///
/// # Examples
///
/// ```rust
/// use extdirect::telemetry;
/// use extdirect_config::Config;
///
/// # fn main() -> Result<(), extdirect::telemetry::TelemetryError> {
/// let config = Config::default();
/// let _first = telemetry::initialise(&config)?;
/// let _second = telemetry::initialise(&config)?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Builds the subscriber filter, adding `debug` directives for the router
/// and transport targets in debug mode.
fn build_filter(config: &Config) -> Result<EnvFilter, TelemetryError> {
    let mut filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    if config.debug() {
        for target in [DISPATCH_TARGET, TRANSPORT_TARGET] {
            let directive = format!("{target}=debug")
                .parse::<Directive>()
                .map_err(|error| TelemetryError::Filter(error.to_string()))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    info!(
        target: DISPATCH_TARGET,
        provider = %config.provider_name(),
        format = %config.log_format(),
        debug = config.debug(),
        "telemetry initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        let config = Config {
            log_filter: "extdirect=verbose".to_owned(),
            ..Config::default()
        };
        let result = build_filter(&config);
        assert!(matches!(result, Err(TelemetryError::Filter(_))));
    }

    #[test]
    fn configured_filter_is_kept_outside_debug_mode() {
        let config = Config {
            log_filter: "warn".to_owned(),
            ..Config::default()
        };
        let filter = build_filter(&config).expect("valid filter").to_string();
        assert!(!filter.contains(DISPATCH_TARGET), "got {filter}");
    }

    #[test]
    fn debug_mode_raises_router_and_transport_targets() {
        let config = Config {
            log_filter: "warn".to_owned(),
            debug: true,
            ..Config::default()
        };
        let filter = build_filter(&config).expect("valid filter").to_string();
        assert!(filter.contains("extdirect::dispatch=debug"), "got {filter}");
        assert!(filter.contains("extdirect::transport=debug"), "got {filter}");
        assert!(filter.contains("warn"), "got {filter}");
    }

    #[test]
    fn initialise_is_idempotent() {
        let config = Config::default();
        assert!(initialise(&config).is_ok());
        assert!(initialise(&config).is_ok());
    }
}
