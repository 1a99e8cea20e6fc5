//! Block lifecycle tracker.
//!
//! One tracker exists per application instance. It sequences the consensus
//! group of calls:
//!
//! ```text
//! Uninitialized --init_chain--> Initialized(first)
//! Initialized(h) | Committed(h-1) --begin_block(h)--> BlockStarted(h)
//! BlockStarted(h) --deliver_tx--> BlockStarted(h)
//! BlockStarted(h) --end_block(h)--> BlockEnded(h)
//! BlockEnded(h) --commit--> Committed(h)
//! ```
//!
//! Each guarded call validates the transition and marks itself in flight
//! under the tracker lock, invokes the application with the lock released,
//! then re-locks to apply the transition and clear the marker. A second
//! consensus call arriving while one is in flight is rejected, so the calls
//! still form one sequence, while `info` and `query` only ever wait for the
//! short bookkeeping sections.
//!
//! An illegal call is rejected with a [`LifecycleViolation`] before the
//! application sees it. An application reply with a non-zero error code is
//! returned unchanged, payload included, and leaves the phase as it was.

mod errors;
mod validators;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use abci_types::{
    BeginBlockRequest, BeginBlockResponse, CommitResponse, ConsensusParams, DeliverTxRequest,
    DeliverTxResponse, EndBlockRequest, EndBlockResponse, InfoResponse, InitChainRequest,
    InitChainResponse, MessageKind, Reply, ValidatorUpdate,
};
use tracing::{debug, info, warn};

pub use self::errors::LifecycleViolation;
pub use self::validators::ValidatorSet;

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Position of the chain in the block lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for `init_chain` (or for `info` to report committed state).
    Uninitialized,
    /// Genesis done; the next block is `first_height`.
    Initialized {
        /// Height of the first block.
        first_height: u64,
    },
    /// Block `height` is open and accepts `deliver_tx`.
    BlockStarted {
        /// Open block height.
        height: u64,
    },
    /// Block `height` is closed and awaits `commit`.
    BlockEnded {
        /// Closed block height.
        height: u64,
    },
    /// Block `height` is committed.
    Committed {
        /// Latest committed height.
        height: u64,
    },
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => formatter.write_str("uninitialized"),
            Self::Initialized { first_height } => {
                write!(formatter, "initialized (first block {first_height})")
            }
            Self::BlockStarted { height } => write!(formatter, "executing block {height}"),
            Self::BlockEnded { height } => write!(formatter, "awaiting commit of block {height}"),
            Self::Committed { height } => write!(formatter, "committed at height {height}"),
        }
    }
}

/// Committed history visible to queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedWindow {
    /// Latest committed height, if any block has been committed.
    pub latest: Option<u64>,
    /// Lowest height the application still retains; zero retains everything.
    pub retain_height: u64,
}

/// Point-in-time copy of the tracker state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Committed history.
    pub window: CommittedWindow,
    /// Digest returned by the latest commit.
    pub last_app_hash: Vec<u8>,
    /// Validators active for the current or next block.
    pub validators: ValidatorSet,
    /// Consensus parameters in force.
    pub consensus_params: Option<ConsensusParams>,
    /// Whether end-block updates are waiting for the next block.
    pub updates_pending: bool,
    /// Consensus call currently inside the application, if any.
    pub in_flight: Option<MessageKind>,
}

#[derive(Debug)]
struct PendingUpdates {
    validators: Vec<ValidatorUpdate>,
    consensus_params: Option<ConsensusParams>,
}

#[derive(Debug)]
struct TrackerState {
    phase: Phase,
    last_committed: Option<u64>,
    last_app_hash: Vec<u8>,
    retain_height: u64,
    validators: ValidatorSet,
    consensus_params: Option<ConsensusParams>,
    pending: Option<PendingUpdates>,
    in_flight: Option<MessageKind>,
}

impl TrackerState {
    const fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            last_committed: None,
            last_app_hash: Vec::new(),
            retain_height: 0,
            validators: ValidatorSet::new(),
            consensus_params: None,
            pending: None,
            in_flight: None,
        }
    }

    fn open_block_height(&self, call: MessageKind) -> Result<u64, LifecycleViolation> {
        match self.phase {
            Phase::BlockStarted { height } => Ok(height),
            phase => Err(LifecycleViolation::OutOfOrder { call, phase }),
        }
    }

    fn apply_pending(&mut self, height: u64) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        self.validators.apply(&pending.validators);
        if let Some(update) = &pending.consensus_params {
            self.consensus_params
                .get_or_insert_with(ConsensusParams::default)
                .merge(update);
        }
        debug!(
            target: LIFECYCLE_TARGET,
            height,
            validator_updates = pending.validators.len(),
            params_updated = pending.consensus_params.is_some(),
            active_validators = self.validators.len(),
            "applied end_block updates"
        );
    }
}

/// Sequencer for the consensus capability group.
#[derive(Debug)]
pub struct BlockLifecycle {
    state: Mutex<TrackerState>,
}

impl Default for BlockLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockLifecycle {
    /// Builds a tracker waiting for genesis.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::new()),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Committed history visible to queries.
    #[must_use]
    pub fn committed_window(&self) -> CommittedWindow {
        let state = self.lock();
        CommittedWindow {
            latest: state.last_committed,
            retain_height: state.retain_height,
        }
    }

    /// Copies the full tracker state.
    #[must_use]
    pub fn snapshot(&self) -> LifecycleSnapshot {
        let state = self.lock();
        LifecycleSnapshot {
            phase: state.phase,
            window: CommittedWindow {
                latest: state.last_committed,
                retain_height: state.retain_height,
            },
            last_app_hash: state.last_app_hash.clone(),
            validators: state.validators.clone(),
            consensus_params: state.consensus_params.clone(),
            updates_pending: state.pending.is_some(),
            in_flight: state.in_flight,
        }
    }

    /// Guards `init_chain`.
    ///
    /// The genesis validators and parameters become active unless the
    /// application replaces them in its response.
    ///
    /// # Errors
    ///
    /// Returns a violation, without calling the application, when the chain
    /// is already initialised or another consensus call is in flight.
    pub fn init_chain<F>(
        &self,
        request: InitChainRequest,
        call: F,
    ) -> Result<Reply<InitChainResponse>, LifecycleViolation>
    where
        F: FnOnce(InitChainRequest) -> Reply<InitChainResponse>,
    {
        let (in_flight, ()) = self.enter(MessageKind::InitChain, |state| {
            match state.phase {
                Phase::Uninitialized => Ok(()),
                phase => Err(LifecycleViolation::AlreadyInitialized { phase }),
            }
        })?;

        let first_height = request.initial_height.max(1);
        let genesis_validators = request.validators.clone();
        let genesis_params = request.consensus_params.clone();
        let reply = call(request);
        let mut state = in_flight.finish();
        if !reply.is_ok() {
            return Ok(reply);
        }

        let response = &reply.value;
        state.validators = if response.validators.is_empty() {
            ValidatorSet::from_updates(&genesis_validators)
        } else {
            ValidatorSet::from_updates(&response.validators)
        };
        state.consensus_params = response.consensus_params.clone().or(genesis_params);
        state.phase = Phase::Initialized { first_height };
        info!(
            target: LIFECYCLE_TARGET,
            first_height,
            validators = state.validators.len(),
            "chain initialised"
        );
        Ok(reply)
    }

    /// Guards `begin_block`.
    ///
    /// Pending end-block updates become active once the application accepts
    /// the block.
    ///
    /// # Errors
    ///
    /// Returns a violation for a missing header, an unexpected height or app
    /// hash, a block opened out of order, or a call made while another is in
    /// flight.
    pub fn begin_block<F>(
        &self,
        request: BeginBlockRequest,
        call: F,
    ) -> Result<Reply<BeginBlockResponse>, LifecycleViolation>
    where
        F: FnOnce(BeginBlockRequest) -> Reply<BeginBlockResponse>,
    {
        let (in_flight, height) = self.enter(MessageKind::BeginBlock, |state| {
            check_begin_block(state, &request)
        })?;

        let reply = call(request);
        let mut state = in_flight.finish();
        if !reply.is_ok() {
            return Ok(reply);
        }
        state.apply_pending(height);
        state.phase = Phase::BlockStarted { height };
        debug!(target: LIFECYCLE_TARGET, height, "block started");
        Ok(reply)
    }

    /// Guards `deliver_tx`. Transactions run in arrival order; a rejected
    /// transaction leaves the block open.
    ///
    /// # Errors
    ///
    /// Returns a violation when no block is open or another consensus call is
    /// in flight.
    pub fn deliver_tx<F>(
        &self,
        request: DeliverTxRequest,
        call: F,
    ) -> Result<Reply<DeliverTxResponse>, LifecycleViolation>
    where
        F: FnOnce(DeliverTxRequest) -> Reply<DeliverTxResponse>,
    {
        let (in_flight, _) = self.enter(MessageKind::DeliverTx, |state| {
            state.open_block_height(MessageKind::DeliverTx)
        })?;
        let reply = call(request);
        drop(in_flight.finish());
        Ok(reply)
    }

    /// Guards `end_block`. Returned updates take effect at the next block.
    ///
    /// # Errors
    ///
    /// Returns a violation when no block is open, the height does not match
    /// it, or another consensus call is in flight.
    pub fn end_block<F>(
        &self,
        request: EndBlockRequest,
        call: F,
    ) -> Result<Reply<EndBlockResponse>, LifecycleViolation>
    where
        F: FnOnce(EndBlockRequest) -> Reply<EndBlockResponse>,
    {
        let (in_flight, height) = self.enter(MessageKind::EndBlock, |state| {
            let height = state.open_block_height(MessageKind::EndBlock)?;
            if request.height == height {
                Ok(height)
            } else {
                Err(LifecycleViolation::UnexpectedHeight {
                    call: MessageKind::EndBlock,
                    expected: height,
                    actual: request.height,
                })
            }
        })?;

        let reply = call(request);
        let mut state = in_flight.finish();
        if !reply.is_ok() {
            return Ok(reply);
        }
        let response = &reply.value;
        state.pending = Some(PendingUpdates {
            validators: response.validator_updates.clone(),
            consensus_params: response.consensus_param_updates.clone(),
        });
        state.phase = Phase::BlockEnded { height };
        debug!(
            target: LIFECYCLE_TARGET,
            height,
            validator_updates = response.validator_updates.len(),
            "block ended"
        );
        Ok(reply)
    }

    /// Guards `commit`.
    ///
    /// Once the application has sealed state the height counts as committed,
    /// even when the returned retain height exceeds it. That hint is ignored
    /// and the reply carries a [`LifecycleViolation::RetainHeightAbove`]
    /// error next to the digest, so a retried commit is rejected as out of
    /// order instead of sealing the block twice.
    ///
    /// # Errors
    ///
    /// Returns a violation when no block is closed or another consensus call
    /// is in flight.
    pub fn commit<F>(&self, call: F) -> Result<Reply<CommitResponse>, LifecycleViolation>
    where
        F: FnOnce() -> Reply<CommitResponse>,
    {
        let (in_flight, height) = self.enter(MessageKind::Commit, |state| match state.phase {
            Phase::BlockEnded { height } => Ok(height),
            phase => Err(LifecycleViolation::OutOfOrder {
                call: MessageKind::Commit,
                phase,
            }),
        })?;

        let reply = call();
        let mut state = in_flight.finish();
        if !reply.is_ok() {
            return Ok(reply);
        }
        let retain_height = reply.value.retain_height;
        if reply.value.data.is_empty() {
            warn!(target: LIFECYCLE_TARGET, height, "commit returned an empty state digest");
        }

        state.phase = Phase::Committed { height };
        state.last_committed = Some(height);
        state.last_app_hash.clone_from(&reply.value.data);
        if retain_height <= height {
            state.retain_height = state.retain_height.max(retain_height);
        }
        info!(
            target: LIFECYCLE_TARGET,
            height,
            retain_height = state.retain_height,
            "block committed"
        );
        drop(state);

        if retain_height > height {
            let violation = reject(LifecycleViolation::RetainHeightAbove {
                retain_height,
                height,
            });
            return Ok(Reply::rejected(reply.value, violation.into()));
        }
        Ok(reply)
    }

    /// Adopts the committed state reported by `info` after a restart.
    ///
    /// Only an uninitialised tracker with no consensus call in flight
    /// resumes, and only when the application reports a non-zero height.
    /// The next legal call is then `begin_block` for the following height.
    pub fn observe_info(&self, response: &InfoResponse) {
        let mut state = self.lock();
        if state.phase != Phase::Uninitialized
            || state.in_flight.is_some()
            || response.last_block_height == 0
        {
            return;
        }
        let height = response.last_block_height;
        state.phase = Phase::Committed { height };
        state.last_committed = Some(height);
        state.last_app_hash.clone_from(&response.last_block_app_hash);
        info!(
            target: LIFECYCLE_TARGET,
            height,
            "resumed from application state reported by info"
        );
    }

    /// Validates `call` against the current state and marks it in flight.
    fn enter<T>(
        &self,
        call: MessageKind,
        check: impl FnOnce(&TrackerState) -> Result<T, LifecycleViolation>,
    ) -> Result<(InFlight<'_>, T), LifecycleViolation> {
        let mut state = self.lock();
        if let Some(running) = state.in_flight {
            return Err(reject(LifecycleViolation::CallInProgress { call, running }));
        }
        let checked = check(&state).map_err(reject)?;
        state.in_flight = Some(call);
        Ok((
            InFlight {
                lifecycle: self,
                armed: true,
            },
            checked,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a consensus call as running inside the application.
///
/// Clears the marker when finished or dropped.
struct InFlight<'a> {
    lifecycle: &'a BlockLifecycle,
    armed: bool,
}

impl<'a> InFlight<'a> {
    /// Re-locks the tracker and clears the marker.
    fn finish(mut self) -> MutexGuard<'a, TrackerState> {
        self.armed = false;
        let mut state = self.lifecycle.lock();
        state.in_flight = None;
        state
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.lifecycle.lock().in_flight = None;
        }
    }
}

fn check_begin_block(
    state: &TrackerState,
    request: &BeginBlockRequest,
) -> Result<u64, LifecycleViolation> {
    let expected = match state.phase {
        Phase::Initialized { first_height } => first_height,
        Phase::Committed { height } => height.saturating_add(1),
        phase => {
            return Err(LifecycleViolation::OutOfOrder {
                call: MessageKind::BeginBlock,
                phase,
            });
        }
    };
    let header = request
        .header
        .as_ref()
        .ok_or(LifecycleViolation::MissingHeader)?;
    if header.height != expected {
        return Err(LifecycleViolation::UnexpectedHeight {
            call: MessageKind::BeginBlock,
            expected,
            actual: header.height,
        });
    }
    if state.last_committed.is_some() && header.app_hash != state.last_app_hash {
        return Err(LifecycleViolation::AppHashMismatch {
            expected: state.last_app_hash.clone(),
            actual: header.app_hash.clone(),
        });
    }
    Ok(expected)
}

fn reject(violation: LifecycleViolation) -> LifecycleViolation {
    warn!(
        target: LIFECYCLE_TARGET,
        violation = %violation,
        "rejected consensus call"
    );
    violation
}
