//! Response payloads.

use serde::{Deserialize, Serialize};

use crate::records::{ConsensusParams, Event, Proof, Snapshot, ValidatorUpdate};

/// Echoed message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoResponse {
    /// The message as received.
    pub message: String,
}

/// Latest committed state of the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoResponse {
    /// Arbitrary application information.
    pub data: String,
    /// Application software version.
    pub version: String,
    /// Application protocol version.
    pub app_version: u64,
    /// Latest height for which `Commit` completed; zero before genesis.
    pub last_block_height: u64,
    /// Digest returned by that `Commit`.
    pub last_block_app_hash: Vec<u8>,
}

/// Acknowledgement of `SetOption`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptionResponse {
    /// Advisory log text.
    pub log: String,
    /// Advisory information.
    pub info: String,
}

/// Result of a state lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    /// Advisory log text.
    pub log: String,
    /// Advisory information.
    pub info: String,
    /// Index of the key in the state tree.
    pub index: u64,
    /// Key that was looked up.
    pub key: Vec<u8>,
    /// Value found; empty when the key is absent.
    pub value: Vec<u8>,
    /// Inclusion or exclusion proof, when requested.
    pub proof: Option<Proof>,
    /// Height the value was read at.
    pub height: u64,
}

/// Outcome of a mempool admission check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckTxResponse {
    /// Result bytes.
    pub data: Vec<u8>,
    /// Advisory log text.
    pub log: String,
    /// Advisory information.
    pub info: String,
    /// Gas requested by the transaction.
    pub gas_wanted: u64,
    /// Gas consumed while checking.
    pub gas_used: u64,
    /// Events for indexing.
    pub events: Vec<Event>,
}

/// Genesis outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitChainResponse {
    /// Replacement consensus parameters, if any.
    pub consensus_params: Option<ConsensusParams>,
    /// Replacement validator set; empty keeps the genesis set.
    pub validators: Vec<ValidatorUpdate>,
}

/// Events raised while opening a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeginBlockResponse {
    /// Events for indexing.
    pub events: Vec<Event>,
}

/// Outcome of executing one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverTxResponse {
    /// Result bytes.
    pub data: Vec<u8>,
    /// Advisory log text.
    pub log: String,
    /// Advisory information.
    pub info: String,
    /// Gas requested by the transaction.
    pub gas_wanted: u64,
    /// Gas consumed.
    pub gas_used: u64,
    /// Events for indexing.
    pub events: Vec<Event>,
}

/// Updates produced when a block is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndBlockResponse {
    /// Validator set changes; power zero removes a validator.
    pub validator_updates: Vec<ValidatorUpdate>,
    /// Consensus parameter changes.
    pub consensus_param_updates: Option<ConsensusParams>,
    /// Events for indexing.
    pub events: Vec<Event>,
}

/// Sealed state for a height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitResponse {
    /// Deterministic state digest.
    pub data: Vec<u8>,
    /// Lowest height the application still needs; zero retains everything.
    pub retain_height: u64,
}

/// Placeholder payload for a slot whose response could not be produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionResponse {
    /// Description of the failure.
    pub error: String,
}

/// Snapshots available to peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSnapshotsResponse {
    /// Local snapshots, in any order.
    pub snapshots: Vec<Snapshot>,
}

/// Verdict on an offered snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferSnapshotResult {
    /// No verdict; the consensus engine aborts state sync.
    #[default]
    Unknown,
    /// Restore this snapshot.
    Accept,
    /// Abort state sync altogether.
    Abort,
    /// Try another snapshot.
    Reject,
    /// Reject every snapshot of this format.
    RejectFormat,
    /// Reject every snapshot from this sender.
    RejectSender,
}

/// Answer to an offered snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferSnapshotResponse {
    /// Verdict.
    pub result: OfferSnapshotResult,
}

/// One chunk of a local snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSnapshotChunkResponse {
    /// Chunk bytes; empty when the chunk does not exist.
    pub chunk: Vec<u8>,
}

/// Verdict on an applied snapshot chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplySnapshotChunkResult {
    /// No verdict; the consensus engine aborts state sync.
    #[default]
    Unknown,
    /// Chunk applied.
    Accept,
    /// Abort state sync altogether.
    Abort,
    /// Fetch and apply the chunk again.
    Retry,
    /// Restart this snapshot from its first chunk.
    RetrySnapshot,
    /// Give up on this snapshot.
    RejectSnapshot,
}

/// Answer to an applied snapshot chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySnapshotChunkResponse {
    /// Verdict.
    pub result: ApplySnapshotChunkResult,
    /// Chunks to fetch again, regardless of the verdict.
    pub refetch_chunks: Vec<u32>,
    /// Peers whose chunks should be rejected.
    pub reject_senders: Vec<String>,
}
