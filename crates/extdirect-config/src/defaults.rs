use crate::logging::LogFormat;

/// Global JavaScript variable assigned by the `api.js` descriptor.
pub const DEFAULT_PROVIDER_NAME: &str = "Ext.app.REMOTING_API";

/// Router endpoint advertised to clients when none is configured.
pub const DEFAULT_ROUTER_URL: &str = "/api/router";

/// Largest router body accepted by the dispatcher, in bytes.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned provider name used where allocation is required (e.g. serde).
pub fn default_provider_name() -> String {
    DEFAULT_PROVIDER_NAME.to_owned()
}

/// Owned router URL used where allocation is required (e.g. serde).
pub fn default_router_url() -> String {
    DEFAULT_ROUTER_URL.to_owned()
}

/// Providers register themselves with `Ext.Direct` unless told otherwise.
pub const fn default_autoadd() -> bool {
    true
}

/// Default router body limit.
pub const fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}
