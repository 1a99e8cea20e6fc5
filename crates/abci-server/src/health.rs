//! Structured health reporting for server lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use abci_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::session::{SessionError, SessionStats};
use crate::transport::ListenerError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for bootstrap, listener and session lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once an endpoint is bound. `local_addr` is set for TCP.
    fn listener_bound(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>);

    /// Invoked when an endpoint cannot be bound or started.
    fn listener_failed(&self, endpoint: &SocketEndpoint, error: &ListenerError);

    /// Invoked when a connection gets its session.
    fn session_opened(&self, session: u64, peer: &str);

    /// Invoked when a session ends, cleanly or through a transport fault.
    fn session_closed(&self, session: u64, outcome: &Result<SessionStats, SessionError>);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_bound(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        (**self).listener_bound(endpoint, local_addr);
    }

    fn listener_failed(&self, endpoint: &SocketEndpoint, error: &ListenerError) {
        (**self).listener_failed(endpoint, error);
    }

    fn session_opened(&self, session: u64, peer: &str) {
        (**self).session_opened(session, peer);
    }

    fn session_closed(&self, session: u64, outcome: &Result<SessionStats, SessionError>) {
        (**self).session_closed(session, outcome);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting server bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.listen_socket(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            max_frame_bytes = config.max_frame_bytes(),
            "server bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "server bootstrap failed"
        );
    }

    fn listener_bound(&self, endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_bound",
            endpoint = %endpoint,
            local_addr = ?local_addr,
            "listening for consensus connections"
        );
    }

    fn listener_failed(&self, endpoint: &SocketEndpoint, error: &ListenerError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "listener_failed",
            endpoint = %endpoint,
            error = %error,
            "failed to listen"
        );
    }

    fn session_opened(&self, session: u64, peer: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_opened",
            session,
            peer,
            "session opened"
        );
    }

    fn session_closed(&self, session: u64, outcome: &Result<SessionStats, SessionError>) {
        match outcome {
            Ok(stats) => tracing::info!(
                target: HEALTH_TARGET,
                event = "session_closed",
                session,
                requests = stats.requests,
                responses = stats.responses,
                "session closed"
            ),
            Err(error) => tracing::warn!(
                target: HEALTH_TARGET,
                event = "session_closed",
                session,
                error = %error,
                "session ended by transport fault"
            ),
        }
    }
}
