use abci_types::DEFAULT_MAX_FRAME_BYTES;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Host the server binds when nothing else is configured.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Conventional ABCI port.
pub const DEFAULT_TCP_PORT: u16 = 26658;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default listening endpoint: TCP on the loopback interface.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_TCP_HOST, DEFAULT_TCP_PORT)
}

/// Largest frame payload accepted by default.
#[must_use]
pub const fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}
