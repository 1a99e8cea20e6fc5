//! Process entry: bootstrap, serve, wait for a signal, stop.

use std::sync::Arc;

use abci_server::{
    BootstrapError, ConfigLoader, HealthReporter, ServerError, ShutdownError, ShutdownSignal,
    StructuredHealthReporter, SystemConfigLoader, SystemShutdownSignal, bootstrap_with,
};
use thiserror::Error;
use tracing::info;

use crate::store::KvStore;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launch");

/// Failures that stop the process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration, telemetry or socket preparation failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The listen socket could not be served or stopped cleanly.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Serves a fresh [`KvStore`] on the configured socket until SIGTERM, SIGINT,
/// SIGQUIT or SIGHUP arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when start-up fails or the listener cannot be
/// stopped.
pub fn run() -> Result<(), LaunchError> {
    run_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal,
    )
}

/// [`run`] with injected collaborators.
///
/// # Errors
///
/// See [`run`].
pub fn run_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let runtime = bootstrap_with(loader, reporter)?;
    let (server, handle) = runtime.serve(KvStore::new())?;
    info!(
        target: LAUNCH_TARGET,
        endpoint = %runtime.config().listen_socket(),
        "kvstore ready"
    );

    let waited = shutdown.wait();
    handle.shutdown();
    handle.join()?;
    waited?;

    info!(
        target: LAUNCH_TARGET,
        height = server.application().last_height(),
        "kvstore stopped"
    );
    Ok(())
}
