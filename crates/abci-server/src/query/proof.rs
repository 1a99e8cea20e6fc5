//! Merkle commitments over sorted key/value state, with inclusion and
//! exclusion proofs.
//!
//! Leaves are hashed as `SHA-256(0x00 || len(key) || key || len(value) ||
//! value)` with varint lengths, inner nodes as `SHA-256(0x01 || left ||
//! right)`. The tree splits at the largest power of two below the leaf count,
//! so a proof for leaf `index` of `total` is the list of sibling hashes from
//! the leaf up to the root.
//!
//! Two op types are produced:
//!
//! - [`EXISTS_OP`] proves that `key` maps to a value. Its data is the leaf
//!   index, the leaf count and the sibling hashes.
//! - [`ABSENT_OP`] proves that `key` is missing by proving the inclusion of
//!   its immediate neighbours, which must be adjacent leaves.
//!
//! [`verify_proof`] folds an op chain: the first op speaks about the queried
//! key, and every following op proves the previous root as a value under its
//! own key, which is how a store root nests inside an outer commitment.

use std::collections::BTreeMap;

use abci_types::{Proof, ProofOp, frame::encode_length};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Op type of an inclusion proof.
pub const EXISTS_OP: &str = "kv:exists";

/// Op type of an exclusion proof.
pub const ABSENT_OP: &str = "kv:absent";

/// SHA-256 digest.
pub type Hash = [u8; 32];

const LEAF_PREFIX: u8 = 0x00;
const INNER_PREFIX: u8 = 0x01;

/// Failures raised while building or checking proofs.
#[derive(Debug, Error)]
pub enum ProofError {
    /// The proof has no ops.
    #[error("proof contains no ops")]
    EmptyProof,
    /// The first op does not speak about the queried key.
    #[error("proof is for a different key")]
    KeyMismatch,
    /// An op of the wrong type appeared in the chain.
    #[error("expected a {expected} op, found '{found}'")]
    UnexpectedOp {
        /// Op type required at this position.
        expected: &'static str,
        /// Op type found.
        found: String,
    },
    /// Op data could not be decoded.
    #[error("malformed {op_type} op: {source}")]
    MalformedOp {
        /// Op type being decoded.
        op_type: String,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The sibling path does not fit the claimed position.
    #[error("inclusion path does not fit its leaf position")]
    InvalidInclusion,
    /// The neighbours do not bracket the key.
    #[error("invalid exclusion proof: {0}")]
    InvalidExclusion(&'static str),
    /// The computed root differs from the expected digest.
    #[error("proof does not match the committed root")]
    RootMismatch,
    /// Op data could not be encoded.
    #[error("failed to encode proof op: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InclusionPath {
    index: u64,
    total: u64,
    aunts: Vec<Hash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Neighbour {
    key: Vec<u8>,
    value: Vec<u8>,
    path: InclusionPath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Exclusion {
    total: u64,
    left: Option<Neighbour>,
    right: Option<Neighbour>,
}

/// Hash of one key/value leaf.
#[must_use]
pub fn leaf_hash(key: &[u8], value: &[u8]) -> Hash {
    let mut encoded = Vec::with_capacity(key.len() + value.len() + 21);
    encoded.push(LEAF_PREFIX);
    encode_length(key.len() as u64, &mut encoded);
    encoded.extend_from_slice(key);
    encode_length(value.len() as u64, &mut encoded);
    encoded.extend_from_slice(value);
    Sha256::digest(&encoded).into()
}

fn inner_hash(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([INNER_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Root of a tree with no leaves.
#[must_use]
pub fn empty_root() -> Hash {
    Sha256::digest([]).into()
}

const fn split_point(total: u64) -> u64 {
    total.next_power_of_two() >> 1
}

fn root_of(hashes: &[Hash]) -> Hash {
    match hashes {
        [] => empty_root(),
        [single] => *single,
        _ => {
            let (left, right) = hashes.split_at(split_index(hashes.len()));
            inner_hash(&root_of(left), &root_of(right))
        }
    }
}

fn split_index(len: usize) -> usize {
    len.next_power_of_two() >> 1
}

fn aunts_of(hashes: &[Hash], index: usize) -> Vec<Hash> {
    if hashes.len() <= 1 {
        return Vec::new();
    }
    let (left, right) = hashes.split_at(split_index(hashes.len()));
    let (mut aunts, sibling) = if index < left.len() {
        (aunts_of(left, index), root_of(right))
    } else {
        (aunts_of(right, index - left.len()), root_of(left))
    };
    aunts.push(sibling);
    aunts
}

fn root_from_path(path: &InclusionPath, leaf: Hash) -> Option<Hash> {
    root_from_aunts(path.index, path.total, leaf, &path.aunts)
}

fn root_from_aunts(index: u64, total: u64, leaf: Hash, aunts: &[Hash]) -> Option<Hash> {
    if index >= total {
        return None;
    }
    if total == 1 {
        return aunts.is_empty().then_some(leaf);
    }
    let (sibling, rest) = aunts.split_last()?;
    let split = split_point(total);
    if index < split {
        let left = root_from_aunts(index, split, leaf, rest)?;
        Some(inner_hash(&left, sibling))
    } else {
        let right = root_from_aunts(index - split, total - split, leaf, rest)?;
        Some(inner_hash(sibling, &right))
    }
}

/// Binary Merkle tree over key/value pairs sorted by key.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    leaves: Vec<Hash>,
    root: Hash,
}

impl MerkleTree {
    /// Builds a tree from a sorted map.
    #[must_use]
    pub fn from_map(map: &BTreeMap<Vec<u8>, Vec<u8>>) -> Self {
        let entries: Vec<_> = map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let leaves: Vec<_> = entries
            .iter()
            .map(|(key, value)| leaf_hash(key, value))
            .collect();
        let root = root_of(&leaves);
        Self {
            entries,
            leaves,
            root,
        }
    }

    /// Root digest.
    #[must_use]
    pub const fn root(&self) -> Hash {
        self.root
    }

    /// Number of leaves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the tree has no leaves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.position(key)
            .ok()
            .and_then(|index| self.entries.get(index))
            .map(|(_, value)| value.as_slice())
    }

    /// Leaf index of `key`, if present.
    #[must_use]
    pub fn index_of(&self, key: &[u8]) -> Option<usize> {
        self.position(key).ok()
    }

    /// Builds an inclusion proof when `key` is present, otherwise an
    /// exclusion proof.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError::Encode`] if the op data cannot be serialised.
    pub fn prove(&self, key: &[u8]) -> Result<ProofOp, ProofError> {
        match self.position(key) {
            Ok(index) => encode_op(EXISTS_OP, key, &self.path(index)),
            Err(insert_at) => {
                let exclusion = Exclusion {
                    total: self.entries.len() as u64,
                    left: insert_at
                        .checked_sub(1)
                        .and_then(|index| self.neighbour(index)),
                    right: self.neighbour(insert_at),
                };
                encode_op(ABSENT_OP, key, &exclusion)
            }
        }
    }

    fn position(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(candidate, _)| candidate.as_slice().cmp(key))
    }

    fn path(&self, index: usize) -> InclusionPath {
        InclusionPath {
            index: index as u64,
            total: self.leaves.len() as u64,
            aunts: aunts_of(&self.leaves, index),
        }
    }

    fn neighbour(&self, index: usize) -> Option<Neighbour> {
        let (key, value) = self.entries.get(index)?;
        Some(Neighbour {
            key: key.clone(),
            value: value.clone(),
            path: self.path(index),
        })
    }
}

fn encode_op<T: Serialize>(op_type: &str, key: &[u8], data: &T) -> Result<ProofOp, ProofError> {
    Ok(ProofOp {
        op_type: op_type.to_owned(),
        key: key.to_vec(),
        data: serde_json::to_vec(data).map_err(ProofError::Encode)?,
    })
}

fn decode_op<T: for<'de> Deserialize<'de>>(
    op: &ProofOp,
    expected: &'static str,
) -> Result<T, ProofError> {
    if op.op_type != expected {
        return Err(ProofError::UnexpectedOp {
            expected,
            found: op.op_type.clone(),
        });
    }
    serde_json::from_slice(&op.data).map_err(|source| ProofError::MalformedOp {
        op_type: op.op_type.clone(),
        source,
    })
}

fn run_exists(op: &ProofOp, value: &[u8]) -> Result<Hash, ProofError> {
    let path: InclusionPath = decode_op(op, EXISTS_OP)?;
    root_from_path(&path, leaf_hash(&op.key, value)).ok_or(ProofError::InvalidInclusion)
}

fn run_absent(op: &ProofOp) -> Result<Hash, ProofError> {
    let exclusion: Exclusion = decode_op(op, ABSENT_OP)?;
    let key = op.key.as_slice();
    let neighbour_root = |neighbour: &Neighbour| -> Result<Hash, ProofError> {
        if neighbour.path.total != exclusion.total {
            return Err(ProofError::InvalidExclusion("neighbour from a different tree"));
        }
        root_from_path(&neighbour.path, leaf_hash(&neighbour.key, &neighbour.value))
            .ok_or(ProofError::InvalidInclusion)
    };

    match (&exclusion.left, &exclusion.right) {
        (None, None) if exclusion.total == 0 => Ok(empty_root()),
        (None, None) => Err(ProofError::InvalidExclusion("no neighbours in a non-empty tree")),
        (Some(left), None) => {
            if left.key.as_slice() >= key {
                return Err(ProofError::InvalidExclusion("left neighbour does not precede key"));
            }
            if left.path.index.checked_add(1) != Some(exclusion.total) {
                return Err(ProofError::InvalidExclusion("left neighbour is not the last leaf"));
            }
            neighbour_root(left)
        }
        (None, Some(right)) => {
            if right.key.as_slice() <= key {
                return Err(ProofError::InvalidExclusion("right neighbour does not follow key"));
            }
            if right.path.index != 0 {
                return Err(ProofError::InvalidExclusion("right neighbour is not the first leaf"));
            }
            neighbour_root(right)
        }
        (Some(left), Some(right)) => {
            if left.key.as_slice() >= key || right.key.as_slice() <= key {
                return Err(ProofError::InvalidExclusion("neighbours do not bracket key"));
            }
            if left.path.index.checked_add(1) != Some(right.path.index) {
                return Err(ProofError::InvalidExclusion("neighbours are not adjacent"));
            }
            let root = neighbour_root(left)?;
            if neighbour_root(right)? != root {
                return Err(ProofError::InvalidExclusion("neighbours disagree on the root"));
            }
            Ok(root)
        }
    }
}

/// Checks `proof` against `root`.
///
/// With `value` set, the first op must prove that `key` maps to it; without,
/// the first op must prove `key` absent. Each further op proves the previous
/// root under its own key.
///
/// # Errors
///
/// Returns [`ProofError`] describing the first check that failed.
pub fn verify_proof(
    proof: &Proof,
    root: &[u8],
    key: &[u8],
    value: Option<&[u8]>,
) -> Result<(), ProofError> {
    let (first, outer) = proof.ops.split_first().ok_or(ProofError::EmptyProof)?;
    if first.key != key {
        return Err(ProofError::KeyMismatch);
    }
    let mut computed = match value {
        Some(value) => run_exists(first, value)?,
        None => run_absent(first)?,
    };
    for op in outer {
        computed = run_exists(op, &computed)?;
    }
    if computed.as_slice() == root {
        Ok(())
    } else {
        Err(ProofError::RootMismatch)
    }
}
