//! Connection acceptance and session wiring.
//!
//! A [`Server`] owns the shared application, one lifecycle tracker for it, and
//! the codec used on the wire. Every accepted connection gets its own
//! [`Session`]; sessions run independently and meet only at the application
//! and the tracker.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use abci_config::SocketEndpoint;
use abci_types::{Codec, DEFAULT_MAX_FRAME_BYTES, JsonCodec};
use thiserror::Error;
use tracing::warn;

use crate::application::Application;
use crate::dispatch::Dispatcher;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::lifecycle::BlockLifecycle;
use crate::session::{Session, SessionError, SessionStats};
use crate::transport::{
    ConnectionHandler, ConnectionStream, ListenerError, ListenerHandle, SocketListener,
};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Errors raised while starting or stopping a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `serve` was called without endpoints.
    #[error("no listening endpoints were supplied")]
    NoEndpoints,
    /// An endpoint could not be bound or started.
    #[error("failed to listen on {endpoint}: {source}")]
    Listener {
        /// Endpoint that failed.
        endpoint: String,
        /// Underlying listener failure.
        #[source]
        source: ListenerError,
    },
}

/// Serves one application to any number of consensus connections.
pub struct Server<A> {
    core: ServerCore<A>,
}

struct ServerCore<A> {
    dispatcher: Dispatcher<A>,
    codec: Arc<dyn Codec>,
    max_frame_bytes: usize,
    reporter: Arc<dyn HealthReporter>,
    sessions: Arc<AtomicU64>,
}

impl<A> Clone for ServerCore<A> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            codec: Arc::clone(&self.codec),
            max_frame_bytes: self.max_frame_bytes,
            reporter: Arc::clone(&self.reporter),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<A: Application> Server<A> {
    /// Builds a server speaking the default JSON codec.
    #[must_use]
    pub fn new(app: A) -> Self {
        Self::with_codec(app, JsonCodec)
    }

    /// Builds a server speaking `codec`.
    #[must_use]
    pub fn with_codec(app: A, codec: impl Codec) -> Self {
        Self::from_shared(Arc::new(app), Arc::new(codec))
    }

    /// Builds a server around an application the caller keeps a handle to.
    #[must_use]
    pub fn from_shared(app: Arc<A>, codec: Arc<dyn Codec>) -> Self {
        Self {
            core: ServerCore {
                dispatcher: Dispatcher::new(app, Arc::new(BlockLifecycle::new())),
                codec,
                max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
                reporter: Arc::new(StructuredHealthReporter::new()),
                sessions: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    /// Caps inbound frames for every session.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.core.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Replaces the health reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn HealthReporter>) -> Self {
        self.core.reporter = reporter;
        self
    }

    /// Shared application.
    #[must_use]
    pub const fn application(&self) -> &Arc<A> {
        self.core.dispatcher.application()
    }

    /// Lifecycle tracker shared by all sessions.
    #[must_use]
    pub const fn lifecycle(&self) -> &Arc<BlockLifecycle> {
        self.core.dispatcher.lifecycle()
    }

    /// Binds every endpoint and starts accepting connections.
    ///
    /// All endpoints are bound before any starts accepting; if one fails,
    /// none is left running.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when no endpoints are given or one of them
    /// cannot be bound or started.
    pub fn serve(&self, endpoints: &[SocketEndpoint]) -> Result<ServerHandle, ServerError> {
        if endpoints.is_empty() {
            return Err(ServerError::NoEndpoints);
        }

        let mut bound = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let listener = SocketListener::bind(endpoint)
                .map_err(|source| self.listener_failed(endpoint, source))?;
            self.core
                .reporter
                .listener_bound(endpoint, listener.local_addr());
            bound.push(listener);
        }

        let handler: Arc<dyn ConnectionHandler> = Arc::new(self.core.clone());
        let mut handle = ServerHandle::default();
        for listener in bound {
            let endpoint = listener.endpoint().clone();
            if let Some(addr) = listener.local_addr() {
                handle.local_addrs.push(addr);
            }
            match listener.start(Arc::clone(&handler)) {
                Ok(listener) => handle.listeners.push(listener),
                Err(source) => {
                    handle.shutdown();
                    if let Err(error) = handle.join() {
                        warn!(target: SERVER_TARGET, error = %error, "failed to stop listeners");
                    }
                    return Err(self.listener_failed(&endpoint, source));
                }
            }
        }
        Ok(handle)
    }

    /// Runs one session on `stream` and returns when it ends.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the session.
    pub fn serve_connection(&self, stream: ConnectionStream) -> Result<SessionStats, SessionError> {
        self.core.run_session(stream)
    }

    fn listener_failed(&self, endpoint: &SocketEndpoint, source: ListenerError) -> ServerError {
        self.core.reporter.listener_failed(endpoint, &source);
        ServerError::Listener {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

impl<A: Application> ServerCore<A> {
    fn run_session(&self, stream: ConnectionStream) -> Result<SessionStats, SessionError> {
        let id = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        self.reporter.session_opened(id, &stream.peer());
        let outcome = stream
            .try_clone()
            .map_err(SessionError::Split)
            .and_then(|writer| {
                Session::new(id, self.dispatcher.clone(), Arc::clone(&self.codec))
                    .with_max_frame_bytes(self.max_frame_bytes)
                    .run(stream, writer)
            });
        self.reporter.session_closed(id, &outcome);
        outcome
    }
}

impl<A: Application> ConnectionHandler for ServerCore<A> {
    fn handle(&self, stream: ConnectionStream) {
        // The reporter has already logged the outcome.
        let _ = self.run_session(stream);
    }
}

/// Running listeners of a [`Server`].
#[derive(Debug, Default)]
pub struct ServerHandle {
    listeners: Vec<ListenerHandle>,
    local_addrs: Vec<SocketAddr>,
}

impl ServerHandle {
    /// Bound TCP addresses, in endpoint order. Unix endpoints are omitted.
    #[must_use]
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Stops accepting new connections. Open sessions run until their peers
    /// disconnect.
    pub fn shutdown(&self) {
        for listener in &self.listeners {
            listener.shutdown();
        }
    }

    /// Waits for every accept loop to exit.
    ///
    /// # Errors
    ///
    /// Returns the first [`ServerError`] raised by a listener thread.
    pub fn join(self) -> Result<(), ServerError> {
        let mut first_error = None;
        for listener in self.listeners {
            let endpoint = listener.endpoint().to_owned();
            if let Err(source) = listener.join() {
                first_error.get_or_insert(ServerError::Listener { endpoint, source });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
