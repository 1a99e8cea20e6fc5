//! Shared configuration for the ABCI server and the binaries built on it.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `ABCI_*` environment variables, then command-line
//! flags. The resulting [`Config`] names the socket to listen on, how to log,
//! and the largest frame a session will accept.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TCP_HOST, DEFAULT_TCP_PORT, default_log_filter,
    default_log_filter_string, default_log_format, default_max_frame_bytes,
    default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use ortho_config::OrthoError;
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "ABCI")]
pub struct Config {
    /// Endpoint the server listens on.
    #[ortho_config(default = default_socket_endpoint())]
    pub listen_socket: SocketEndpoint,
    /// `tracing` filter directive applied at start-up.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log lines.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Largest frame payload a session accepts, in bytes.
    #[ortho_config(default = default_max_frame_bytes())]
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, `ABCI_*` environment
    /// variables and any discovered configuration file.
    ///
    /// # Errors
    ///
    /// Returns the `ortho_config` failure when a layer cannot be read or the
    /// merged values do not deserialise.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration using `args` in place of the process arguments.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Endpoint the server listens on.
    #[must_use]
    pub const fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Frame size ceiling in bytes.
    #[must_use]
    pub const fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }
}
