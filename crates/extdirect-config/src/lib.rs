//! Layered configuration for Ext.Direct providers.
//!
//! Values are resolved by `ortho_config` in increasing order of precedence:
//! built-in defaults, an `extdirect.toml` file (located through
//! `--config-path`, `EXTDIRECT_CONFIG_PATH` or the usual discovery paths),
//! `EXTDIRECT_*` environment variables, and finally command-line flags.
//! `autoadd` and `debug` have no command-line flag: the generated flags are
//! presence switches that always report `false` when omitted, which would
//! override file and environment values.
//!
//! The resulting [`Config`] describes how the provider renders its API
//! descriptor (`provider_name`, `autoadd`, `timeout_secs`, `router_url`), how
//! the router treats requests (`debug`, `max_request_bytes`) and how telemetry
//! is emitted (`log_filter`, `log_format`).

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_PROVIDER_NAME, DEFAULT_ROUTER_URL,
    default_autoadd, default_log_filter, default_log_filter_string, default_log_format,
    default_max_request_bytes, default_provider_name, default_router_url,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "EXTDIRECT",
    discovery(
        app_name = "extdirect",
        env_var = "EXTDIRECT_CONFIG_PATH",
        config_file_name = "extdirect.toml",
        dotfile_name = ".extdirect.toml",
        config_cli_long = "config-path"
    )
)]
pub struct Config {
    /// JavaScript variable the `api.js` descriptor assigns.
    #[serde(default = "defaults::default_provider_name")]
    pub provider_name: String,
    /// Emit `Ext.Direct.addProvider(...)` after the descriptor assignment.
    #[serde(default = "defaults::default_autoadd")]
    #[ortho_config(skip_cli)]
    pub autoadd: bool,
    /// Client-side call timeout in seconds; zero defers to the ExtJS default.
    #[serde(default)]
    pub timeout_secs: u64,
    /// Router endpoint advertised in the descriptor.
    #[serde(default = "defaults::default_router_url")]
    pub router_url: String,
    /// Include error source chains in failure envelopes.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub debug: bool,
    /// Largest router body accepted, in bytes.
    #[serde(default = "defaults::default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            autoadd: default_autoadd(),
            timeout_secs: 0,
            router_url: default_router_url(),
            debug: false,
            max_request_bytes: default_max_request_bytes(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// JavaScript variable the descriptor is assigned to.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Whether `api.js` registers the provider with `Ext.Direct`.
    #[must_use]
    pub const fn autoadd(&self) -> bool {
        self.autoadd
    }

    /// Client-side timeout rendered into the descriptor, in milliseconds.
    #[must_use]
    pub const fn timeout_millis(&self) -> u64 {
        self.timeout_secs.saturating_mul(1000)
    }

    /// Router endpoint advertised to clients.
    #[must_use]
    pub fn router_url(&self) -> &str {
        &self.router_url
    }

    /// Whether failure envelopes carry diagnostic detail.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Router body limit in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Configured `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_extjs_conventions() {
        let config = Config::default();
        assert_eq!(config.provider_name(), "Ext.app.REMOTING_API");
        assert!(config.autoadd());
        assert_eq!(config.timeout_millis(), 0);
        assert_eq!(config.router_url(), DEFAULT_ROUTER_URL);
        assert!(!config.debug());
        assert_eq!(config.max_request_bytes(), DEFAULT_MAX_REQUEST_BYTES);
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn timeout_renders_in_milliseconds() {
        let config = Config {
            timeout_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.timeout_millis(), 30_000);
    }
}
