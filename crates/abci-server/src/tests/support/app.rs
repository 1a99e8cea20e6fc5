//! Application double that records the calls it receives.

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use abci_types::{
    BeginBlockRequest, BeginBlockResponse, CheckTxRequest, CheckTxResponse, CommitResponse,
    DeliverTxRequest, DeliverTxResponse, EchoRequest, EchoResponse, EndBlockRequest,
    EndBlockResponse, InfoRequest, InfoResponse, InitChainRequest, InitChainResponse,
    ListSnapshotsResponse, MessageKind, QueryRequest, QueryResponse, Reply, ResponseError,
    ValidatorUpdate,
};

use crate::application::{Consensus, Info, Mempool, Snapshot};

#[derive(Default)]
struct AppState {
    calls: Vec<MessageKind>,
    delivered: Vec<Vec<u8>>,
    echoed: Vec<String>,
    committed: u64,
    height: u64,
    end_block_updates: HashMap<u64, Vec<ValidatorUpdate>>,
    retain_height: u64,
    reported_height: u64,
}

/// Application that records every call and answers predictably.
///
/// `commit` returns `hash-<height>` as its digest; `query` echoes the key as
/// the value and reports the height it was asked for. Empty transactions are
/// rejected with one unit of gas wanted. `list_snapshots` advertises one
/// snapshot at the latest committed height.
#[derive(Default)]
pub struct RecordingApp {
    state: Mutex<AppState>,
    echo_delay: Duration,
    echo_delays: HashMap<String, Duration>,
    check_tx_delay: Duration,
    query_delay: Duration,
}

impl RecordingApp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every echo by `delay`.
    pub fn with_echo_delay(mut self, delay: Duration) -> Self {
        self.echo_delay = delay;
        self
    }

    /// Delays the echo of `message` by `delay`, overriding the common delay.
    pub fn with_echo_delay_for(mut self, message: &str, delay: Duration) -> Self {
        self.echo_delays.insert(message.to_owned(), delay);
        self
    }

    /// Delays every check-tx by `delay`.
    pub fn with_check_tx_delay(mut self, delay: Duration) -> Self {
        self.check_tx_delay = delay;
        self
    }

    /// Delays every query by `delay`.
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Makes `end_block(height)` return `updates`.
    pub fn with_end_block_updates(self, height: u64, updates: Vec<ValidatorUpdate>) -> Self {
        self.lock().end_block_updates.insert(height, updates);
        self
    }

    /// Makes every commit report `retain_height`.
    pub fn with_retain_height(self, retain_height: u64) -> Self {
        self.lock().retain_height = retain_height;
        self
    }

    /// Makes `info` report `height` as the last committed block.
    pub fn reporting_height(self, height: u64) -> Self {
        self.lock().reported_height = height;
        self
    }

    /// Calls received so far, in the order they reached the application.
    pub fn calls(&self) -> Vec<MessageKind> {
        self.lock().calls.clone()
    }

    /// Consensus calls received so far.
    pub fn consensus_calls(&self) -> Vec<MessageKind> {
        self.calls()
            .into_iter()
            .filter(|kind| {
                matches!(
                    kind,
                    MessageKind::InitChain
                        | MessageKind::BeginBlock
                        | MessageKind::DeliverTx
                        | MessageKind::EndBlock
                        | MessageKind::Commit
                )
            })
            .collect()
    }

    /// Echo messages, in the order the application finished them.
    pub fn echoed(&self) -> Vec<String> {
        self.lock().echoed.clone()
    }

    /// Transactions executed by `deliver_tx`, in execution order.
    pub fn delivered(&self) -> Vec<Vec<u8>> {
        self.lock().delivered.clone()
    }

    fn record(&self, kind: MessageKind) {
        self.lock().calls.push(kind);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AppState> {
        self.state.lock().expect("recording app mutex poisoned")
    }
}

impl Consensus for RecordingApp {
    fn init_chain(&self, _request: InitChainRequest) -> Reply<InitChainResponse> {
        self.record(MessageKind::InitChain);
        Reply::ok(InitChainResponse::default())
    }

    fn begin_block(&self, request: BeginBlockRequest) -> Reply<BeginBlockResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::BeginBlock);
        state.height = request.height().unwrap_or_default();
        Reply::ok(BeginBlockResponse::default())
    }

    fn deliver_tx(&self, request: DeliverTxRequest) -> Reply<DeliverTxResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::DeliverTx);
        if request.tx.is_empty() {
            return Reply::failed(ResponseError::new(1, "recording").with_log("empty transaction"));
        }
        state.delivered.push(request.tx.clone());
        Reply::ok(DeliverTxResponse {
            data: request.tx,
            ..DeliverTxResponse::default()
        })
    }

    fn end_block(&self, request: EndBlockRequest) -> Reply<EndBlockResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::EndBlock);
        let validator_updates = state
            .end_block_updates
            .remove(&request.height)
            .unwrap_or_default();
        Reply::ok(EndBlockResponse {
            validator_updates,
            ..EndBlockResponse::default()
        })
    }

    fn commit(&self) -> Reply<CommitResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::Commit);
        state.committed = state.height;
        Reply::ok(CommitResponse {
            data: format!("hash-{}", state.height).into_bytes(),
            retain_height: state.retain_height,
        })
    }
}

impl Info for RecordingApp {
    fn info(&self, _request: InfoRequest) -> Reply<InfoResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::Info);
        let height = state.reported_height;
        Reply::ok(InfoResponse {
            data: String::from("recording"),
            last_block_height: height,
            last_block_app_hash: if height == 0 {
                Vec::new()
            } else {
                format!("hash-{height}").into_bytes()
            },
            ..InfoResponse::default()
        })
    }

    fn echo(&self, request: EchoRequest) -> Reply<EchoResponse> {
        let delay = self
            .echo_delays
            .get(&request.message)
            .copied()
            .unwrap_or(self.echo_delay);
        thread::sleep(delay);
        let mut state = self.lock();
        state.calls.push(MessageKind::Echo);
        state.echoed.push(request.message.clone());
        Reply::ok(EchoResponse {
            message: request.message,
        })
    }

    fn query(&self, request: QueryRequest) -> Reply<QueryResponse> {
        thread::sleep(self.query_delay);
        self.record(MessageKind::Query);
        Reply::ok(QueryResponse {
            key: request.data.clone(),
            value: request.data,
            height: request.height,
            ..QueryResponse::default()
        })
    }
}

impl Mempool for RecordingApp {
    fn check_tx(&self, request: CheckTxRequest) -> Reply<CheckTxResponse> {
        thread::sleep(self.check_tx_delay);
        self.record(MessageKind::CheckTx);
        if request.tx.is_empty() {
            return Reply::rejected(
                CheckTxResponse {
                    gas_wanted: 1,
                    ..CheckTxResponse::default()
                },
                ResponseError::new(1, "recording").with_log("empty transaction"),
            );
        }
        Reply::ok(CheckTxResponse::default())
    }
}

impl Snapshot for RecordingApp {
    fn list_snapshots(&self) -> Reply<ListSnapshotsResponse> {
        let mut state = self.lock();
        state.calls.push(MessageKind::ListSnapshots);
        let snapshots = if state.committed == 0 {
            Vec::new()
        } else {
            vec![abci_types::Snapshot {
                height: state.committed,
                format: 1,
                chunks: 1,
                hash: format!("hash-{}", state.committed).into_bytes(),
                metadata: Vec::new(),
            }]
        };
        Reply::ok(ListSnapshotsResponse { snapshots })
    }
}
