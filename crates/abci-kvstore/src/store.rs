//! Merkle-committed key/value application.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use abci_server::query::proof::MerkleTree;
use abci_server::{Consensus, Info, Mempool, Snapshot};
use abci_types::{
    BeginBlockRequest, BeginBlockResponse, CheckTxRequest, CheckTxResponse,
    CommitResponse, DeliverTxRequest, DeliverTxResponse, EndBlockRequest, EndBlockResponse, Event,
    InfoRequest, InfoResponse, InitChainRequest, InitChainResponse, Proof, QueryRequest,
    QueryResponse, Reply, ResponseError, SetOptionRequest, SetOptionResponse, ValidatorUpdate,
};
use tracing::{debug, info};

use crate::transaction::{Transaction, VALIDATOR_PREFIX};

const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// Codespace of every error raised by the store.
pub const CODESPACE: &str = "kvstore";

/// Application error codes.
pub mod codes {
    /// The transaction is malformed.
    pub const INVALID_TRANSACTION: u32 = 1;
    /// `set_option` named an unknown option or an invalid value.
    pub const INVALID_OPTION: u32 = 2;
    /// The query path is not served.
    pub const UNKNOWN_PATH: u32 = 3;
    /// The snapshot for the requested height is gone.
    pub const SNAPSHOT_MISSING: u32 = 4;
    /// A proof could not be produced.
    pub const PROOF_FAILED: u32 = 5;
}

/// Option controlling how many committed heights stay queryable.
pub const RETAIN_BLOCKS_OPTION: &str = "retain_blocks";

#[derive(Debug, Default)]
struct StoreState {
    working: BTreeMap<Vec<u8>, Vec<u8>>,
    snapshots: BTreeMap<u64, MerkleTree>,
    last_height: u64,
    last_app_hash: Vec<u8>,
    block_height: u64,
    block_txs: u64,
    validator_updates: Vec<ValidatorUpdate>,
    retain_blocks: u64,
}

impl StoreState {
    fn apply(&mut self, tx: Transaction) -> Vec<u8> {
        match tx {
            Transaction::Set { key, value } => {
                self.working.insert(key.clone(), value);
                key
            }
            Transaction::Validator(update) => {
                let mut key = VALIDATOR_PREFIX.to_vec();
                key.extend_from_slice(hex::encode(&update.public_key.data).as_bytes());
                if update.is_removal() {
                    self.working.remove(&key);
                } else {
                    self.working
                        .insert(key.clone(), update.power.to_string().into_bytes());
                }
                self.validator_updates.push(update);
                key
            }
        }
    }

    /// Lowest height kept after committing `height`.
    fn retain_height(&self, height: u64) -> u64 {
        if self.retain_blocks == 0 || height < self.retain_blocks {
            0
        } else {
            height - self.retain_blocks + 1
        }
    }
}

/// Key/value store whose state digest is the root of a Merkle tree over all
/// entries.
///
/// Writes stage into the open block and become queryable once committed.
/// Every committed height keeps a snapshot, pruned to the last
/// `retain_blocks` heights when that option is set.
#[derive(Debug, Default)]
pub struct KvStore {
    state: Mutex<StoreState>,
}

impl KvStore {
    /// Builds an empty store that keeps every height.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty store that keeps the last `retain_blocks` heights; zero
    /// keeps every height.
    #[must_use]
    pub fn with_retain_blocks(retain_blocks: u64) -> Self {
        let store = Self::new();
        store.lock().retain_blocks = retain_blocks;
        store
    }

    /// Latest committed height.
    #[must_use]
    pub fn last_height(&self) -> u64 {
        self.lock().last_height
    }

    /// Digest of the latest commit.
    #[must_use]
    pub fn last_app_hash(&self) -> Vec<u8> {
        self.lock().last_app_hash.clone()
    }

    /// Heights whose snapshots are still held.
    #[must_use]
    pub fn retained_heights(&self) -> Vec<u64> {
        self.lock().snapshots.keys().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KvStore {
    fn lookup(&self, request: QueryRequest) -> Result<QueryResponse, ResponseError> {
        if !matches!(request.path.as_str(), "" | "/store") {
            return Err(rejected(
                codes::UNKNOWN_PATH,
                format!("unknown query path '{}'", request.path),
            ));
        }
        let state = self.lock();
        let genesis;
        let tree = match state.snapshots.get(&request.height) {
            Some(tree) => tree,
            // Nothing committed yet: answer from the empty genesis state.
            None if request.height == 0 && state.snapshots.is_empty() => {
                genesis = MerkleTree::from_map(&BTreeMap::new());
                &genesis
            }
            None => {
                return Err(rejected(
                    codes::SNAPSHOT_MISSING,
                    format!("no snapshot for height {}", request.height),
                ));
            }
        };

        let value = tree.get(&request.data).map(<[u8]>::to_vec);
        let proof = if request.prove {
            let op = tree
                .prove(&request.data)
                .map_err(|error| rejected(codes::PROOF_FAILED, error.to_string()))?;
            Some(Proof { ops: vec![op] })
        } else {
            None
        };
        Ok(QueryResponse {
            log: String::from(if value.is_some() {
                "exists"
            } else {
                "does not exist"
            }),
            index: tree
                .index_of(&request.data)
                .map_or(0, |index| index as u64),
            key: request.data,
            value: value.unwrap_or_default(),
            proof,
            height: request.height,
            ..QueryResponse::default()
        })
    }
}

fn rejected(code: u32, log: impl Into<String>) -> ResponseError {
    ResponseError::new(code, CODESPACE).with_log(log)
}

fn parse(tx: &[u8]) -> Result<Transaction, ResponseError> {
    Transaction::parse(tx).map_err(|error| rejected(codes::INVALID_TRANSACTION, error.to_string()))
}

impl Consensus for KvStore {
    fn init_chain(&self, request: InitChainRequest) -> Reply<InitChainResponse> {
        let mut state = self.lock();
        for update in &request.validators {
            state.apply(Transaction::Validator(update.clone()));
        }
        // Genesis validators are active already; only block updates are
        // reported back.
        state.validator_updates.clear();
        info!(
            target: STORE_TARGET,
            chain_id = %request.chain_id,
            validators = request.validators.len(),
            "genesis"
        );
        Reply::ok(InitChainResponse::default())
    }

    fn begin_block(&self, request: BeginBlockRequest) -> Reply<BeginBlockResponse> {
        let mut state = self.lock();
        state.block_height = request.height().unwrap_or_default();
        state.block_txs = 0;
        state.validator_updates.clear();
        Reply::ok(BeginBlockResponse::default())
    }

    fn deliver_tx(&self, request: DeliverTxRequest) -> Reply<DeliverTxResponse> {
        let tx = match parse(&request.tx) {
            Ok(tx) => tx,
            Err(error) => return Reply::failed(error),
        };
        let mut state = self.lock();
        let key = state.apply(tx);
        state.block_txs += 1;
        Reply::ok(DeliverTxResponse {
            events: vec![
                Event::new("app")
                    .with_attribute("creator", "abci-kvstore")
                    .with_attribute("key", key),
            ],
            ..DeliverTxResponse::default()
        })
    }

    fn end_block(&self, _request: EndBlockRequest) -> Reply<EndBlockResponse> {
        let mut state = self.lock();
        Reply::ok(EndBlockResponse {
            validator_updates: std::mem::take(&mut state.validator_updates),
            ..EndBlockResponse::default()
        })
    }

    fn commit(&self) -> Reply<CommitResponse> {
        let mut state = self.lock();
        let height = state.block_height;
        let tree = MerkleTree::from_map(&state.working);
        let app_hash = tree.root().to_vec();
        state.snapshots.insert(height, tree);

        let retain_height = state.retain_height(height);
        state.snapshots = state.snapshots.split_off(&retain_height);
        state.last_height = height;
        state.last_app_hash.clone_from(&app_hash);
        debug!(
            target: STORE_TARGET,
            height,
            txs = state.block_txs,
            keys = state.working.len(),
            retain_height,
            "committed"
        );
        Reply::ok(CommitResponse {
            data: app_hash,
            retain_height,
        })
    }
}

impl Info for KvStore {
    fn info(&self, _request: InfoRequest) -> Reply<InfoResponse> {
        let state = self.lock();
        let size = state
            .snapshots
            .get(&state.last_height)
            .map_or(0, MerkleTree::len);
        Reply::ok(InfoResponse {
            data: serde_json::json!({ "size": size }).to_string(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            app_version: 1,
            last_block_height: state.last_height,
            last_block_app_hash: state.last_app_hash.clone(),
        })
    }

    fn set_option(&self, request: SetOptionRequest) -> Reply<SetOptionResponse> {
        if request.key != RETAIN_BLOCKS_OPTION {
            return Reply::failed(rejected(
                codes::INVALID_OPTION,
                format!("unknown option '{}'", request.key),
            ));
        }
        let Ok(retain_blocks) = request.value.parse::<u64>() else {
            return Reply::failed(rejected(
                codes::INVALID_OPTION,
                format!("{RETAIN_BLOCKS_OPTION} must be a non-negative integer"),
            ));
        };
        self.lock().retain_blocks = retain_blocks;
        info!(target: STORE_TARGET, retain_blocks, "retention updated");
        Reply::ok(SetOptionResponse {
            log: format!("{RETAIN_BLOCKS_OPTION}={retain_blocks}"),
            ..SetOptionResponse::default()
        })
    }

    fn query(&self, request: QueryRequest) -> Reply<QueryResponse> {
        self.lookup(request).map_or_else(Reply::failed, Reply::ok)
    }
}

impl Mempool for KvStore {
    fn check_tx(&self, request: CheckTxRequest) -> Reply<CheckTxResponse> {
        let response = CheckTxResponse {
            gas_wanted: 1,
            ..CheckTxResponse::default()
        };
        match parse(&request.tx) {
            Ok(_) => Reply::ok(response),
            Err(error) => Reply::rejected(response, error),
        }
    }
}

/// Snapshots are not served; state sync falls back to replaying blocks.
impl Snapshot for KvStore {}

#[cfg(test)]
mod tests;
