//! FIFO response emission.

use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

use abci_types::{Codec, MessageKind, Response, ResponseError, write_frame};
use tracing::{trace, warn};

use super::{SESSION_TARGET, SessionError};

/// Reserved position in the response stream.
pub(super) enum Slot {
    /// Response computed on the reading thread.
    Ready(Response),
    /// Response still being computed by a worker.
    Pending {
        /// Kind of the request the worker is answering.
        kind: MessageKind,
        /// One-shot reply from the worker.
        reply: Receiver<Response>,
    },
}

pub(super) struct ResponseWriter<W: Write> {
    session: u64,
    codec: Arc<dyn Codec>,
    out: BufWriter<W>,
}

impl<W: Write> ResponseWriter<W> {
    pub(super) fn new(session: u64, codec: Arc<dyn Codec>, out: W) -> Self {
        Self {
            session,
            codec,
            out: BufWriter::new(out),
        }
    }

    /// Writes every slot in queue order until the queue closes. Returns the
    /// number of responses written.
    pub(super) fn drain(mut self, queue: &Receiver<Slot>) -> Result<u64, SessionError> {
        let mut written = 0_u64;
        loop {
            let slot = match queue.try_recv() {
                Ok(slot) => slot,
                Err(TryRecvError::Empty) => {
                    self.flush()?;
                    match queue.recv() {
                        Ok(slot) => slot,
                        Err(_) => break,
                    }
                }
                Err(TryRecvError::Disconnected) => break,
            };
            let response = self.resolve(slot)?;
            self.emit(&response)?;
            written += 1;
            if response.kind() == MessageKind::Flush {
                self.flush()?;
            }
        }
        self.flush()?;
        Ok(written)
    }

    fn resolve(&mut self, slot: Slot) -> Result<Response, SessionError> {
        match slot {
            Slot::Ready(response) => Ok(response),
            Slot::Pending { kind, reply } => {
                if let Ok(response) = reply.try_recv() {
                    return Ok(response);
                }
                // Earlier responses must not wait behind a slow worker.
                self.flush()?;
                Ok(reply.recv().unwrap_or_else(|_| {
                    warn!(
                        target: SESSION_TARGET,
                        session = self.session,
                        %kind,
                        "request worker exited without replying"
                    );
                    Response::failed(
                        kind,
                        ResponseError::internal_fault(format!(
                            "{kind} worker exited without replying"
                        )),
                    )
                }))
            }
        }
    }

    fn emit(&mut self, response: &Response) -> Result<(), SessionError> {
        let payload = match self.codec.encode_response(response) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    session = self.session,
                    kind = %response.kind(),
                    error = %error,
                    "failed to encode response; sending exception"
                );
                let placeholder = Response::exception(format!(
                    "failed to encode {} response: {error}",
                    response.kind()
                ));
                self.codec
                    .encode_response(&placeholder)
                    .map_err(SessionError::Encode)?
            }
        };
        write_frame(&mut self.out, &payload).map_err(SessionError::Write)?;
        trace!(
            target: SESSION_TARGET,
            session = self.session,
            kind = %response.kind(),
            "response queued for the peer"
        );
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SessionError> {
        self.out.flush().map_err(SessionError::Write)
    }
}
