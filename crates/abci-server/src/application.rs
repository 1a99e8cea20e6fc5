//! Capability groups an application implements.
//!
//! The consensus engine reaches the application through four groups of
//! operations. [`Consensus`] mutates chain state and is sequenced by the block
//! lifecycle tracker; [`Info`], [`Mempool`] and [`Snapshot`] are always
//! callable. Optional operations carry default bodies, so an application only
//! overrides what it needs.
//!
//! Every method returns a [`Reply`]: the payload plus, independently, the
//! error fields of the response. A rejection keeps its payload, so a refused
//! transaction still reports its gas and events.
//!
//! Every method takes `&self`: the application is shared by all sessions and
//! synchronises its own state. Methods on different groups may run
//! concurrently.

use abci_types::{
    ApplySnapshotChunkRequest, ApplySnapshotChunkResponse, BeginBlockRequest, BeginBlockResponse,
    CheckTxRequest, CheckTxResponse, CommitResponse, DeliverTxRequest, DeliverTxResponse,
    EchoRequest, EchoResponse, EndBlockRequest, EndBlockResponse, InfoRequest, InfoResponse,
    InitChainRequest, InitChainResponse, ListSnapshotsResponse, LoadSnapshotChunkRequest,
    LoadSnapshotChunkResponse, OfferSnapshotRequest, OfferSnapshotResponse, QueryRequest,
    QueryResponse, Reply, SetOptionRequest, SetOptionResponse,
};

/// Operations that mutate chain state.
///
/// A reply with a non-zero error code leaves the lifecycle phase where it
/// was, except for `deliver_tx`, whose rejection only concerns the
/// transaction.
pub trait Consensus: Send + Sync + 'static {
    /// Genesis. Called once per chain.
    fn init_chain(&self, request: InitChainRequest) -> Reply<InitChainResponse>;

    /// Opens the block described by the request header.
    fn begin_block(&self, request: BeginBlockRequest) -> Reply<BeginBlockResponse>;

    /// Executes one transaction of the open block.
    fn deliver_tx(&self, request: DeliverTxRequest) -> Reply<DeliverTxResponse>;

    /// Closes the open block and reports validator and parameter changes.
    fn end_block(&self, request: EndBlockRequest) -> Reply<EndBlockResponse>;

    /// Seals state for the closed block and returns its digest.
    fn commit(&self) -> Reply<CommitResponse>;

    /// Response barrier hook. Does nothing by default.
    fn flush(&self) -> Reply<()> {
        Reply::ok(())
    }
}

/// Read-only state inspection.
pub trait Info: Send + Sync + 'static {
    /// Reports the latest committed state.
    fn info(&self, request: InfoRequest) -> Reply<InfoResponse>;

    /// Echoes the message unchanged.
    fn echo(&self, request: EchoRequest) -> Reply<EchoResponse> {
        Reply::ok(EchoResponse {
            message: request.message,
        })
    }

    /// Sets a non-consensus option. Ignored by default.
    fn set_option(&self, _request: SetOptionRequest) -> Reply<SetOptionResponse> {
        Reply::ok(SetOptionResponse::default())
    }

    /// Looks up state. Returns an empty result by default.
    ///
    /// Once a block is committed the height on the request has been resolved
    /// against the committed history and is never zero. Before the first
    /// commit it is passed through as sent, usually zero.
    fn query(&self, _request: QueryRequest) -> Reply<QueryResponse> {
        Reply::ok(QueryResponse::default())
    }
}

/// Mempool admission.
pub trait Mempool: Send + Sync + 'static {
    /// Checks whether a transaction may enter the mempool.
    fn check_tx(&self, request: CheckTxRequest) -> Reply<CheckTxResponse>;
}

/// State-sync snapshots. Every method has a neutral default, so an
/// application without snapshot support implements the trait with an empty
/// body.
pub trait Snapshot: Send + Sync + 'static {
    /// Lists the snapshots this application can serve. None by default.
    fn list_snapshots(&self) -> Reply<ListSnapshotsResponse> {
        Reply::ok(ListSnapshotsResponse::default())
    }

    /// Decides whether to restore an offered snapshot. Gives no verdict by
    /// default, which makes the consensus engine abort state sync.
    fn offer_snapshot(&self, _request: OfferSnapshotRequest) -> Reply<OfferSnapshotResponse> {
        Reply::ok(OfferSnapshotResponse::default())
    }

    /// Loads one chunk of a local snapshot. Empty by default.
    fn load_snapshot_chunk(
        &self,
        _request: LoadSnapshotChunkRequest,
    ) -> Reply<LoadSnapshotChunkResponse> {
        Reply::ok(LoadSnapshotChunkResponse::default())
    }

    /// Applies one chunk of the snapshot being restored. Gives no verdict by
    /// default.
    fn apply_snapshot_chunk(
        &self,
        _request: ApplySnapshotChunkRequest,
    ) -> Reply<ApplySnapshotChunkResponse> {
        Reply::ok(ApplySnapshotChunkResponse::default())
    }
}

/// An application exposing all four capability groups.
pub trait Application: Consensus + Info + Mempool + Snapshot {}

impl<T> Application for T where T: Consensus + Info + Mempool + Snapshot {}
