//! Immutable value records carried inside requests and responses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Public key of a validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicKey {
    /// Key algorithm, for example `ed25519`.
    pub key_type: String,
    /// Raw key bytes.
    pub data: Vec<u8>,
}

impl PublicKey {
    /// Builds an `ed25519` key from raw bytes.
    #[must_use]
    pub fn ed25519(data: impl Into<Vec<u8>>) -> Self {
        Self {
            key_type: "ed25519".to_owned(),
            data: data.into(),
        }
    }
}

/// Change to the validator set. A power of zero removes the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorUpdate {
    /// Validator key.
    pub public_key: PublicKey,
    /// New voting power.
    pub power: u64,
}

impl ValidatorUpdate {
    /// Builds an update for the given key and power.
    #[must_use]
    pub fn new(public_key: PublicKey, power: u64) -> Self {
        Self { public_key, power }
    }

    /// Returns `true` when the update removes the validator.
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.power == 0
    }
}

/// Validator as identified in commit and evidence records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Validator {
    /// Address of the validator (hash of its public key).
    pub address: Vec<u8>,
    /// Voting power.
    pub power: u64,
}

/// Whether a validator signed the previous block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoteInfo {
    /// The validator.
    pub validator: Validator,
    /// `true` when the validator's signature is in the last commit.
    pub signed_last_block: bool,
}

/// Per-validator signing record of the previous block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastCommitInfo {
    /// Commit round.
    pub round: u32,
    /// Votes of the previous validator set.
    pub votes: Vec<VoteInfo>,
}

/// Report of validator misbehaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Evidence {
    /// Hierarchical evidence type, for example `duplicate/vote`.
    pub evidence_type: String,
    /// The offending validator.
    pub validator: Validator,
    /// Height at which the offence happened.
    pub height: u64,
    /// Block time at that height, as a duration since the Unix epoch.
    pub time: Option<Duration>,
    /// Total voting power of the validator set at `height`.
    pub total_voting_power: u64,
}

/// Protocol versions recorded in a block header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    /// Block protocol version.
    pub block: u64,
    /// Application protocol version.
    pub app: u64,
}

/// Header of a block part set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartSetHeader {
    /// Number of parts.
    pub total: u32,
    /// Merkle root of the parts.
    pub hash: Vec<u8>,
}

/// Identifier of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockId {
    /// Block hash.
    pub hash: Vec<u8>,
    /// Part set header.
    pub parts: PartSetHeader,
}

/// Block header delivered with `BeginBlock`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Protocol versions.
    pub version: Version,
    /// Chain identifier.
    pub chain_id: String,
    /// Height of the block.
    pub height: u64,
    /// Block time as a duration since the Unix epoch.
    pub time: Option<Duration>,
    /// Identifier of the previous block.
    pub last_block_id: Option<BlockId>,
    /// Hash of the previous block's commit.
    pub last_commit_hash: Vec<u8>,
    /// Hash of the block's transactions.
    pub data_hash: Vec<u8>,
    /// Hash of the validator set for this block.
    pub validators_hash: Vec<u8>,
    /// Hash of the validator set for the next block.
    pub next_validators_hash: Vec<u8>,
    /// Hash of the consensus parameters.
    pub consensus_hash: Vec<u8>,
    /// State digest returned by the previous `Commit`.
    pub app_hash: Vec<u8>,
    /// Hash of the previous block's results.
    pub last_results_hash: Vec<u8>,
    /// Hash of the evidence in the block.
    pub evidence_hash: Vec<u8>,
    /// Address of the block proposer.
    pub proposer_address: Vec<u8>,
}

impl Header {
    /// Builds a header for `height` on `chain_id` carrying `app_hash`.
    #[must_use]
    pub fn at(chain_id: impl Into<String>, height: u64, app_hash: impl Into<Vec<u8>>) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            app_hash: app_hash.into(),
            ..Self::default()
        }
    }
}

/// Limits on block size and gas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockParams {
    /// Maximum block size in bytes.
    pub max_bytes: u64,
    /// Maximum gas per block; zero means unlimited.
    pub max_gas: u64,
}

/// Limits on the age of admissible evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceParams {
    /// Maximum evidence age in blocks.
    pub max_age_num_blocks: u64,
    /// Maximum evidence age in time.
    pub max_age_duration: Option<Duration>,
}

/// Accepted validator key types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorParams {
    /// Names of accepted public key types.
    pub public_key_types: Vec<String>,
}

/// Consensus-critical parameters.
///
/// Each group is optional so an update can change one group and leave the
/// others untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Block limits.
    pub block: Option<BlockParams>,
    /// Evidence limits.
    pub evidence: Option<EvidenceParams>,
    /// Validator key limits.
    pub validator: Option<ValidatorParams>,
}

impl ConsensusParams {
    /// Overlays every group present in `update` onto `self`.
    pub fn merge(&mut self, update: &Self) {
        if let Some(block) = &update.block {
            self.block = Some(block.clone());
        }
        if let Some(evidence) = &update.evidence {
            self.evidence = Some(evidence.clone());
        }
        if let Some(validator) = &update.validator {
            self.validator = Some(validator.clone());
        }
    }
}

/// Key/value attribute of an [`Event`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventAttribute {
    /// Attribute key.
    pub key: Vec<u8>,
    /// Attribute value.
    pub value: Vec<u8>,
    /// Whether the consensus engine should index the attribute.
    pub index: bool,
}

/// Event emitted for filtering and indexing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Event type.
    pub event_type: String,
    /// Attributes.
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Builds an event with no attributes.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an indexed attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
            index: true,
        });
        self
    }
}

/// State-sync snapshot advertised by an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Height the snapshot was taken at.
    pub height: u64,
    /// Application-defined format version.
    pub format: u32,
    /// Number of chunks.
    pub chunks: u32,
    /// Digest of the whole snapshot, checked after restoration.
    pub hash: Vec<u8>,
    /// Arbitrary application metadata.
    pub metadata: Vec<u8>,
}

/// One link in a proof chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofOp {
    /// Proof type; tells the verifier how to decode `data`.
    pub op_type: String,
    /// Key the op speaks about.
    pub key: Vec<u8>,
    /// Encoded proof material.
    pub data: Vec<u8>,
}

/// Ordered chain of proof ops.
///
/// The root computed by one op is the value proven by the next; the root of
/// the final op must equal the state digest being verified against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proof {
    /// Ops, innermost first.
    pub ops: Vec<ProofOp>,
}
