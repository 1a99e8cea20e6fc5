//! Configuration loaders used by the bootstrap suites.

use std::ffi::OsString;
use std::sync::Arc;

use abci_config::{Config, SocketEndpoint};
use ortho_config::OrthoError;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that listens on a Unix socket under a temporary directory, or on
/// an ephemeral loopback port where Unix sockets are unavailable.
pub struct TestConfigLoader {
    socket_dir: TempDir,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create temporary socket directory"),
        }
    }

    fn endpoint(&self) -> SocketEndpoint {
        if cfg!(unix) {
            let path = self.socket_dir.path().join("nested").join("abci.sock");
            SocketEndpoint::unix(
                path.to_str()
                    .expect("temporary socket path was not valid UTF-8"),
            )
        } else {
            SocketEndpoint::tcp("127.0.0.1", 0)
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: self.endpoint(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("abci-server"),
            OsString::from("--listen-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
