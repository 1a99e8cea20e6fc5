//! Protocol violations raised by the block lifecycle tracker.

use abci_types::{MessageKind, ResponseError};
use thiserror::Error;

use super::Phase;

/// A consensus call that is illegal in the tracker's current phase.
///
/// Violations are raised before the application is called and never advance
/// the tracker; the one exception is [`Self::RetainHeightAbove`], reported
/// after a commit the application has already sealed. They reach the
/// consensus engine as a response carrying
/// [`abci_types::codes::PROTOCOL_VIOLATION`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleViolation {
    /// `init_chain` after the chain was initialised or resumed.
    #[error("init_chain is not allowed once the chain is {phase}")]
    AlreadyInitialized {
        /// Phase at the time of the call.
        phase: Phase,
    },
    /// The call does not fit the current phase.
    #[error("{call} is not allowed while {phase}")]
    OutOfOrder {
        /// Rejected call.
        call: MessageKind,
        /// Phase at the time of the call.
        phase: Phase,
    },
    /// Another consensus call is still inside the application.
    #[error("{call} is not allowed while {running} is in progress")]
    CallInProgress {
        /// Rejected call.
        call: MessageKind,
        /// Call still running.
        running: MessageKind,
    },
    /// `begin_block` without a header.
    #[error("begin_block carries no header")]
    MissingHeader,
    /// The call names a height other than the one the tracker expects.
    #[error("{call} for height {actual}, expected height {expected}")]
    UnexpectedHeight {
        /// Rejected call.
        call: MessageKind,
        /// Height the tracker expected.
        expected: u64,
        /// Height carried by the request.
        actual: u64,
    },
    /// The header does not carry the digest returned by the previous commit.
    #[error("begin_block header app_hash {actual:02x?} does not match committed digest {expected:02x?}")]
    AppHashMismatch {
        /// Digest returned by the previous commit.
        expected: Vec<u8>,
        /// Digest carried by the header.
        actual: Vec<u8>,
    },
    /// `commit` returned a retain height above the committed height. The
    /// height is committed regardless and the hint is ignored.
    #[error("commit retain_height {retain_height} exceeds committed height {height}")]
    RetainHeightAbove {
        /// Hint returned by the application.
        retain_height: u64,
        /// Height being committed.
        height: u64,
    },
}

impl From<LifecycleViolation> for ResponseError {
    fn from(violation: LifecycleViolation) -> Self {
        Self::protocol_violation(violation.to_string())
    }
}
