//! Protocol core of an ABCI application server.
//!
//! A consensus engine drives an application's state machine through four
//! groups of calls: consensus (block execution), info (queries), mempool
//! (transaction admission) and snapshot (state sync). This crate terminates the engine's connections and
//! enforces the contract that keeps replicated execution deterministic:
//!
//! - [`Session`] owns one connection. Consensus requests run inline, the
//!   others on one worker per session, and responses leave in arrival order.
//!   `flush` is a barrier.
//! - [`Dispatcher`] routes each request to its [`Capability`] group, contains
//!   application panics, and resolves query heights.
//! - [`BlockLifecycle`] sequences consensus calls across every connection:
//!   `init_chain`, then `begin_block`, `deliver_tx`*, `end_block`, `commit`
//!   for each height. Out-of-order calls are answered with a protocol
//!   violation and never reach the application.
//! - [`query`] resolves historical heights and builds Merkle proofs.
//! - [`Server`] accepts connections on TCP or Unix endpoints and gives each
//!   its own session over the shared [`Application`].
//!
//! Processes normally start through [`bootstrap_with`], which loads
//! [`abci_config::Config`], installs telemetry and prepares the listen socket.
//!
//! Failures come in three tiers. Transport faults end one session. Protocol
//! violations and application rejections are ordinary responses carrying a
//! populated [`ResponseError`](abci_types::ResponseError).

mod application;
mod bootstrap;
mod dispatch;
mod health;
mod lifecycle;
pub mod query;
mod server;
mod session;
mod shutdown;
pub mod telemetry;
pub mod transport;

pub use application::{Application, Consensus, Info, Mempool, Snapshot};
pub use bootstrap::{
    BootstrapError, ConfigLoader, Runtime, SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use dispatch::{Capability, Dispatcher};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use lifecycle::{
    BlockLifecycle, CommittedWindow, LifecycleSnapshot, LifecycleViolation, Phase, ValidatorSet,
};
pub use query::QueryError;
pub use server::{Server, ServerError, ServerHandle};
pub use session::{QUEUE_DEPTH, Session, SessionError, SessionStats};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
