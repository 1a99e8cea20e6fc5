//! Capability routing for decoded requests.
//!
//! Every request belongs to one of the four capability groups an application
//! implements. The [`Dispatcher`] resolves that group, runs consensus calls
//! through the [`BlockLifecycle`](crate::lifecycle::BlockLifecycle) guard,
//! resolves query heights, and turns the application's reply, payload and
//! error alike, into a [`Response`](abci_types::Response) of the request's
//! kind. A panic inside an
//! application method is contained and reported as an internal fault.

mod guard;
mod router;

use std::fmt;

use abci_types::{MessageKind, Request};

pub use self::router::Dispatcher;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Capability group that owns a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Chain-state mutation plus the flush barrier. Sequenced by the
    /// lifecycle tracker.
    Consensus,
    /// Read-only inspection.
    Info,
    /// Mempool admission.
    Mempool,
    /// State-sync snapshots.
    Snapshot,
}

impl Capability {
    /// Group that owns requests of `kind`, or `None` for housekeeping kinds.
    #[must_use]
    pub const fn of_kind(kind: MessageKind) -> Option<Self> {
        match kind {
            MessageKind::Flush
            | MessageKind::InitChain
            | MessageKind::BeginBlock
            | MessageKind::DeliverTx
            | MessageKind::EndBlock
            | MessageKind::Commit => Some(Self::Consensus),
            MessageKind::Echo | MessageKind::Info | MessageKind::SetOption | MessageKind::Query => {
                Some(Self::Info)
            }
            MessageKind::CheckTx => Some(Self::Mempool),
            MessageKind::ListSnapshots
            | MessageKind::OfferSnapshot
            | MessageKind::LoadSnapshotChunk
            | MessageKind::ApplySnapshotChunk => Some(Self::Snapshot),
            MessageKind::Exception => None,
        }
    }

    /// Group that owns `request`.
    #[must_use]
    pub const fn of_request(request: &Request) -> Self {
        match request {
            Request::Flush
            | Request::InitChain(_)
            | Request::BeginBlock(_)
            | Request::DeliverTx(_)
            | Request::EndBlock(_)
            | Request::Commit => Self::Consensus,
            Request::Echo(_) | Request::Info(_) | Request::SetOption(_) | Request::Query(_) => {
                Self::Info
            }
            Request::CheckTx(_) => Self::Mempool,
            Request::ListSnapshots(_)
            | Request::OfferSnapshot(_)
            | Request::LoadSnapshotChunk(_)
            | Request::ApplySnapshotChunk(_) => Self::Snapshot,
        }
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consensus => "consensus",
            Self::Info => "info",
            Self::Mempool => "mempool",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
