//! Closed request and response sum types.
//!
//! Each request variant pairs with exactly one response variant carrying the
//! same [`MessageKind`]. A [`Response`] wraps its payload together with the
//! optional [`ResponseError`], so a failed call still answers with the tag of
//! the request that caused it.
//!
//! Both sum types are adjacently tagged on the wire: the tag sits under
//! `kind` and the payload under `body`, so payload fields never collide with
//! the tag.

mod requests;
mod responses;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResponseError;
use crate::reply::Reply;

pub use self::requests::*;
pub use self::responses::*;

/// Tag shared by a request and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Connection test.
    Echo,
    /// Response barrier.
    Flush,
    /// Application state summary.
    Info,
    /// Non-consensus option.
    SetOption,
    /// State lookup.
    Query,
    /// Mempool admission.
    CheckTx,
    /// Genesis.
    InitChain,
    /// Block start.
    BeginBlock,
    /// Transaction execution.
    DeliverTx,
    /// Block end.
    EndBlock,
    /// State sealing.
    Commit,
    /// Snapshot discovery.
    ListSnapshots,
    /// Snapshot offer during state sync.
    OfferSnapshot,
    /// Snapshot chunk retrieval.
    LoadSnapshotChunk,
    /// Snapshot chunk restoration.
    ApplySnapshotChunk,
    /// Housekeeping placeholder for a response that could not be encoded.
    Exception,
}

impl MessageKind {
    /// Returns the canonical snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Flush => "flush",
            Self::Info => "info",
            Self::SetOption => "set_option",
            Self::Query => "query",
            Self::CheckTx => "check_tx",
            Self::InitChain => "init_chain",
            Self::BeginBlock => "begin_block",
            Self::DeliverTx => "deliver_tx",
            Self::EndBlock => "end_block",
            Self::Commit => "commit",
            Self::ListSnapshots => "list_snapshots",
            Self::OfferSnapshot => "offer_snapshot",
            Self::LoadSnapshotChunk => "load_snapshot_chunk",
            Self::ApplySnapshotChunk => "apply_snapshot_chunk",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Request sent by the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Request {
    /// Echo a message.
    Echo(EchoRequest),
    /// Flush queued responses.
    Flush,
    /// Report the latest committed state.
    Info(InfoRequest),
    /// Set an option.
    SetOption(SetOptionRequest),
    /// Read state.
    Query(QueryRequest),
    /// Check a transaction for mempool admission.
    CheckTx(CheckTxRequest),
    /// Initialise the chain.
    InitChain(InitChainRequest),
    /// Open a block.
    BeginBlock(BeginBlockRequest),
    /// Execute a transaction.
    DeliverTx(DeliverTxRequest),
    /// Close a block.
    EndBlock(EndBlockRequest),
    /// Seal state.
    Commit,
    /// List local snapshots.
    ListSnapshots(ListSnapshotsRequest),
    /// Offer a snapshot for restoration.
    OfferSnapshot(OfferSnapshotRequest),
    /// Load a chunk of a local snapshot.
    LoadSnapshotChunk(LoadSnapshotChunkRequest),
    /// Apply a chunk of the snapshot being restored.
    ApplySnapshotChunk(ApplySnapshotChunkRequest),
}

impl Request {
    /// Returns the tag of the request.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Echo(_) => MessageKind::Echo,
            Self::Flush => MessageKind::Flush,
            Self::Info(_) => MessageKind::Info,
            Self::SetOption(_) => MessageKind::SetOption,
            Self::Query(_) => MessageKind::Query,
            Self::CheckTx(_) => MessageKind::CheckTx,
            Self::InitChain(_) => MessageKind::InitChain,
            Self::BeginBlock(_) => MessageKind::BeginBlock,
            Self::DeliverTx(_) => MessageKind::DeliverTx,
            Self::EndBlock(_) => MessageKind::EndBlock,
            Self::Commit => MessageKind::Commit,
            Self::ListSnapshots(_) => MessageKind::ListSnapshots,
            Self::OfferSnapshot(_) => MessageKind::OfferSnapshot,
            Self::LoadSnapshotChunk(_) => MessageKind::LoadSnapshotChunk,
            Self::ApplySnapshotChunk(_) => MessageKind::ApplySnapshotChunk,
        }
    }

    /// Builds an echo request.
    #[must_use]
    pub fn echo(message: impl Into<String>) -> Self {
        Self::Echo(EchoRequest {
            message: message.into(),
        })
    }

    /// Builds a deliver-tx request.
    #[must_use]
    pub fn deliver_tx(tx: impl Into<Vec<u8>>) -> Self {
        Self::DeliverTx(DeliverTxRequest { tx: tx.into() })
    }

    /// Builds a new-transaction check-tx request.
    #[must_use]
    pub fn check_tx(tx: impl Into<Vec<u8>>) -> Self {
        Self::CheckTx(CheckTxRequest {
            tx: tx.into(),
            kind: CheckTxKind::New,
        })
    }

    /// Builds an end-block request.
    #[must_use]
    pub const fn end_block(height: u64) -> Self {
        Self::EndBlock(EndBlockRequest { height })
    }
}

/// Response payload, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ResponseValue {
    /// Echoed message.
    Echo(EchoResponse),
    /// Flush acknowledgement.
    Flush,
    /// Application state summary.
    Info(InfoResponse),
    /// Option acknowledgement.
    SetOption(SetOptionResponse),
    /// Lookup result.
    Query(QueryResponse),
    /// Admission outcome.
    CheckTx(CheckTxResponse),
    /// Genesis outcome.
    InitChain(InitChainResponse),
    /// Block start events.
    BeginBlock(BeginBlockResponse),
    /// Transaction outcome.
    DeliverTx(DeliverTxResponse),
    /// Block end updates.
    EndBlock(EndBlockResponse),
    /// State digest.
    Commit(CommitResponse),
    /// Local snapshots.
    ListSnapshots(ListSnapshotsResponse),
    /// Verdict on an offered snapshot.
    OfferSnapshot(OfferSnapshotResponse),
    /// Snapshot chunk.
    LoadSnapshotChunk(LoadSnapshotChunkResponse),
    /// Verdict on an applied chunk.
    ApplySnapshotChunk(ApplySnapshotChunkResponse),
    /// Housekeeping placeholder.
    Exception(ExceptionResponse),
}

impl ResponseValue {
    /// Returns the tag of the payload.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Echo(_) => MessageKind::Echo,
            Self::Flush => MessageKind::Flush,
            Self::Info(_) => MessageKind::Info,
            Self::SetOption(_) => MessageKind::SetOption,
            Self::Query(_) => MessageKind::Query,
            Self::CheckTx(_) => MessageKind::CheckTx,
            Self::InitChain(_) => MessageKind::InitChain,
            Self::BeginBlock(_) => MessageKind::BeginBlock,
            Self::DeliverTx(_) => MessageKind::DeliverTx,
            Self::EndBlock(_) => MessageKind::EndBlock,
            Self::Commit(_) => MessageKind::Commit,
            Self::ListSnapshots(_) => MessageKind::ListSnapshots,
            Self::OfferSnapshot(_) => MessageKind::OfferSnapshot,
            Self::LoadSnapshotChunk(_) => MessageKind::LoadSnapshotChunk,
            Self::ApplySnapshotChunk(_) => MessageKind::ApplySnapshotChunk,
            Self::Exception(_) => MessageKind::Exception,
        }
    }

    /// Returns the neutral payload for `kind`.
    #[must_use]
    pub fn empty(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Echo => Self::Echo(EchoResponse::default()),
            MessageKind::Flush => Self::Flush,
            MessageKind::Info => Self::Info(InfoResponse::default()),
            MessageKind::SetOption => Self::SetOption(SetOptionResponse::default()),
            MessageKind::Query => Self::Query(QueryResponse::default()),
            MessageKind::CheckTx => Self::CheckTx(CheckTxResponse::default()),
            MessageKind::InitChain => Self::InitChain(InitChainResponse::default()),
            MessageKind::BeginBlock => Self::BeginBlock(BeginBlockResponse::default()),
            MessageKind::DeliverTx => Self::DeliverTx(DeliverTxResponse::default()),
            MessageKind::EndBlock => Self::EndBlock(EndBlockResponse::default()),
            MessageKind::Commit => Self::Commit(CommitResponse::default()),
            MessageKind::ListSnapshots => Self::ListSnapshots(ListSnapshotsResponse::default()),
            MessageKind::OfferSnapshot => Self::OfferSnapshot(OfferSnapshotResponse::default()),
            MessageKind::LoadSnapshotChunk => {
                Self::LoadSnapshotChunk(LoadSnapshotChunkResponse::default())
            }
            MessageKind::ApplySnapshotChunk => {
                Self::ApplySnapshotChunk(ApplySnapshotChunkResponse::default())
            }
            MessageKind::Exception => Self::Exception(ExceptionResponse::default()),
        }
    }
}

/// Response emitted to the consensus engine.
///
/// The payload and the error are independent: an application rejection
/// carries whatever payload the application produced alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Response payload.
    pub value: ResponseValue,
    /// Populated when the call was rejected or failed.
    #[serde(default)]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Pairs a payload with its error fields.
    #[must_use]
    pub const fn new(value: ResponseValue, error: Option<ResponseError>) -> Self {
        Self { value, error }
    }

    /// Builds a successful response.
    #[must_use]
    pub const fn ok(value: ResponseValue) -> Self {
        Self::new(value, None)
    }

    /// Builds a failed response carrying the neutral payload for `kind`.
    ///
    /// Used where no payload exists, such as a call the application never
    /// saw.
    #[must_use]
    pub fn failed(kind: MessageKind, error: ResponseError) -> Self {
        Self::new(ResponseValue::empty(kind), Some(error))
    }

    /// Builds a response from an application reply.
    #[must_use]
    pub fn from_reply(reply: Reply<ResponseValue>) -> Self {
        Self::new(reply.value, reply.error)
    }

    /// Builds the housekeeping placeholder used when a response cannot be
    /// encoded.
    #[must_use]
    pub fn exception(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            value: ResponseValue::Exception(ExceptionResponse {
                error: message.clone(),
            }),
            error: Some(ResponseError::internal_fault(message)),
        }
    }

    /// Returns the tag of the response.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.value.kind()
    }

    /// Returns `true` when no error, or a success-coded error, is attached.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.as_ref().is_none_or(ResponseError::is_ok)
    }
}
