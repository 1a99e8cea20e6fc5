//! Transport faults that end a session.

use std::io;

use abci_types::{CodecError, FrameError};
use thiserror::Error;

/// Faults fatal to one session. The server and other sessions carry on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The inbound byte stream is not a valid frame sequence.
    #[error("failed to read request frame: {0}")]
    Frame(#[from] FrameError),
    /// A frame did not decode into a request.
    #[error("failed to decode request: {0}")]
    Decode(#[source] CodecError),
    /// Neither a response nor its exception placeholder could be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[source] CodecError),
    /// Writing to the peer failed.
    #[error("failed to write response: {0}")]
    Write(#[source] io::Error),
    /// The connection could not be split into reading and writing halves.
    #[error("failed to split connection stream: {0}")]
    Split(#[source] io::Error),
    /// The response writer or request worker thread could not be started.
    #[error("failed to spawn session thread: {0}")]
    Spawn(#[source] io::Error),
    /// The response writer thread panicked.
    #[error("response writer panicked")]
    WriterPanic,
    /// The request worker thread panicked.
    #[error("request worker panicked")]
    WorkerPanic,
}
