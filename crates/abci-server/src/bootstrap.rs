//! Server bootstrap orchestration.

use std::sync::Arc;

use abci_config::{Config, SocketPreparationError};
use ortho_config::OrthoError;
use thiserror::Error;

use crate::application::Application;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::server::{Server, ServerError, ServerHandle};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Configuration source, abstracted for tests.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader failure.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The Unix socket directory could not be prepared.
    #[error("failed to prepare listen socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Configured process state ready to serve an application.
pub struct Runtime {
    config: Config,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Runtime {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Telemetry handle, mostly useful to tests.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Builds a server for `app` using the configured frame limit and this
    /// runtime's reporter.
    #[must_use]
    pub fn server<A: Application>(&self, app: A) -> Server<A> {
        Server::new(app)
            .with_max_frame_bytes(self.config.max_frame_bytes())
            .with_reporter(Arc::clone(&self.reporter))
    }

    /// Serves `app` on the configured listen socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the socket cannot be bound.
    pub fn serve<A: Application>(&self, app: A) -> Result<(Server<A>, ServerHandle), ServerError> {
        let server = self.server(app);
        let handle = server.serve(std::slice::from_ref(self.config.listen_socket()))?;
        Ok((server, handle))
    }
}

/// Loads configuration, installs telemetry and prepares the socket path.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails; the reporter sees
/// the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Runtime, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.listen_socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    reporter.bootstrap_succeeded(&config);
    Ok(Runtime {
        config,
        telemetry,
        reporter,
    })
}

/// Bootstraps with the system configuration and the structured reporter.
///
/// # Errors
///
/// See [`bootstrap_with`].
pub fn bootstrap() -> Result<Runtime, BootstrapError> {
    bootstrap_with(&SystemConfigLoader, Arc::new(StructuredHealthReporter::new()))
}
