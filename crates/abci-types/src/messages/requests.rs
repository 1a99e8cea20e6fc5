//! Request payloads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::records::{
    ConsensusParams, Evidence, Header, LastCommitInfo, Snapshot, ValidatorUpdate,
};

/// Echo a string back; used to test the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoRequest {
    /// Message to echo.
    pub message: String,
}

/// Ask the application for its latest committed state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoRequest {
    /// Consensus engine software version.
    pub version: String,
    /// Block protocol version.
    pub block_version: u64,
    /// P2P protocol version.
    pub p2p_version: u64,
}

/// Set a non-consensus-critical application option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOptionRequest {
    /// Option name.
    pub key: String,
    /// Option value.
    pub value: String,
}

/// Look up application state at a committed height.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    /// Query key bytes.
    pub data: Vec<u8>,
    /// Query path, like an HTTP GET path.
    pub path: String,
    /// Committed height to read; zero means the latest committed height.
    pub height: u64,
    /// Whether a proof should accompany the value.
    pub prove: bool,
}

/// Distinguishes first-time mempool admission from post-commit rechecks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckTxKind {
    /// Transaction seen for the first time.
    #[default]
    New,
    /// Transaction still in the mempool after a commit.
    Recheck,
}

/// Mempool admission check for a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckTxRequest {
    /// Raw transaction bytes.
    pub tx: Vec<u8>,
    /// Whether this is a new transaction or a recheck.
    pub kind: CheckTxKind,
}

/// Genesis call, made once per chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitChainRequest {
    /// Genesis time as a duration since the Unix epoch.
    pub time: Option<Duration>,
    /// Chain identifier.
    pub chain_id: String,
    /// Initial consensus parameters.
    pub consensus_params: Option<ConsensusParams>,
    /// Genesis validator set.
    pub validators: Vec<ValidatorUpdate>,
    /// Serialised initial application state.
    pub app_state_bytes: Vec<u8>,
    /// Height of the first block; zero is read as one.
    pub initial_height: u64,
}

/// Opens a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeginBlockRequest {
    /// Block hash.
    pub hash: Vec<u8>,
    /// Block header; required.
    pub header: Option<Header>,
    /// Signing record of the previous block.
    pub last_commit_info: LastCommitInfo,
    /// Evidence of validator misbehaviour.
    pub byzantine_validators: Vec<Evidence>,
}

impl BeginBlockRequest {
    /// Builds a request opening the block described by `header`.
    #[must_use]
    pub fn for_header(header: Header) -> Self {
        Self {
            header: Some(header),
            ..Self::default()
        }
    }

    /// Height announced by the header, if any.
    #[must_use]
    pub fn height(&self) -> Option<u64> {
        self.header.as_ref().map(|header| header.height)
    }
}

/// Executes one transaction of the open block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverTxRequest {
    /// Raw transaction bytes.
    pub tx: Vec<u8>,
}

/// Closes the open block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndBlockRequest {
    /// Height of the block being closed.
    pub height: u64,
}

/// Asks for the snapshots the application can serve to peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSnapshotsRequest {}

/// Offers a peer's snapshot for restoration during state sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfferSnapshotRequest {
    /// Snapshot on offer.
    pub snapshot: Option<Snapshot>,
    /// Light-client verified app hash for the snapshot height.
    pub app_hash: Vec<u8>,
}

/// Asks for one chunk of a local snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSnapshotChunkRequest {
    /// Snapshot height.
    pub height: u64,
    /// Snapshot format.
    pub format: u32,
    /// Chunk index.
    pub chunk: u32,
}

/// Hands over one chunk of the snapshot being restored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySnapshotChunkRequest {
    /// Chunk index.
    pub index: u32,
    /// Chunk bytes.
    pub chunk: Vec<u8>,
    /// Peer that sent the chunk.
    pub sender: String,
}
