//! Health reporter that records events for assertions.

use std::net::SocketAddr;
use std::sync::Mutex;

use abci_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::session::{SessionError, SessionStats};
use crate::transport::ListenerError;

/// Records health events for assertions.
#[derive(Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_bound(&self, _endpoint: &SocketEndpoint, local_addr: Option<SocketAddr>) {
        self.record(HealthEvent::ListenerBound(local_addr));
    }

    fn listener_failed(&self, endpoint: &SocketEndpoint, _error: &ListenerError) {
        self.record(HealthEvent::ListenerFailed(endpoint.to_string()));
    }

    fn session_opened(&self, session: u64, _peer: &str) {
        self.record(HealthEvent::SessionOpened(session));
    }

    fn session_closed(&self, session: u64, outcome: &Result<SessionStats, SessionError>) {
        self.record(HealthEvent::SessionClosed {
            session,
            ok: outcome.is_ok(),
        });
    }
}

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// An endpoint was bound.
    ListenerBound(Option<SocketAddr>),
    /// An endpoint failed to bind.
    ListenerFailed(String),
    /// A session started.
    SessionOpened(u64),
    /// A session ended.
    SessionClosed {
        /// Session identifier.
        session: u64,
        /// Whether it ended without a transport fault.
        ok: bool,
    },
}
