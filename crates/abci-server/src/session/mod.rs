//! One connection's request stream.
//!
//! A session reads length-delimited frames, decodes them into requests, and
//! hands each one to the [`Dispatcher`]. Responses are written strictly in
//! arrival order while processing may overlap:
//!
//! - consensus requests, including `flush`, run inline on the reading thread,
//!   so they reach the application in the order they arrived;
//! - info, mempool and snapshot requests go to the session's single worker
//!   thread, which runs them one at a time in arrival order and hands each
//!   response back through a one-shot channel.
//!
//! Every request reserves a [`Slot`](writer::Slot) in a bounded FIFO queue. A
//! writer thread resolves slots front to back, so a slow query holds back the
//! responses behind it while consensus calls behind it keep running. The writer
//! flushes the socket whenever the queue runs dry and right after a `flush`
//! response.
//!
//! A framing or decoding failure ends the session once every response queued
//! ahead of it has been written. Application failures never end a session.

mod errors;
mod writer;

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use abci_types::{Codec, DEFAULT_MAX_FRAME_BYTES, FrameReader, Request, Response};
use tracing::{debug, trace, warn};

use crate::application::Application;
use crate::dispatch::{Capability, Dispatcher};

pub use self::errors::SessionError;
use self::writer::{ResponseWriter, Slot};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Responses that may wait in the queue, and requests that may wait for the
/// worker, before the reader blocks.
pub const QUEUE_DEPTH: usize = 1024;

/// Non-consensus request waiting for the session worker.
struct Job {
    request: Request,
    reply: SyncSender<Response>,
}

/// Counters reported when a session ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Requests decoded and scheduled.
    pub requests: u64,
    /// Responses written.
    pub responses: u64,
}

/// Request pipeline for one connection.
pub struct Session<A> {
    id: u64,
    dispatcher: Dispatcher<A>,
    codec: Arc<dyn Codec>,
    max_frame_bytes: usize,
}

impl<A: Application> Session<A> {
    /// Creates a session that dispatches through `dispatcher`.
    #[must_use]
    pub fn new(id: u64, dispatcher: Dispatcher<A>, codec: Arc<dyn Codec>) -> Self {
        Self {
            id,
            dispatcher,
            codec,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Caps the size of a single inbound frame.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Serves requests from `reader`, writing responses to `writer`, until the
    /// peer closes the stream or a transport fault occurs.
    ///
    /// Returns once every scheduled request has been answered or the writer
    /// has failed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] for framing, decoding and write failures.
    pub fn run<R, W>(&self, reader: R, writer: W) -> Result<SessionStats, SessionError>
    where
        R: Read,
        W: Write + Send,
    {
        debug!(target: SESSION_TARGET, session = self.id, "session started");
        let (slots, queue) = mpsc::sync_channel(QUEUE_DEPTH);
        let (jobs, backlog) = mpsc::sync_channel(QUEUE_DEPTH);
        let response_writer = ResponseWriter::new(self.id, Arc::clone(&self.codec), writer);

        let (read_result, write_result) = thread::scope(|scope| {
            let dispatcher = &self.dispatcher;
            let worker_thread = thread::Builder::new()
                .name(format!("abci-session-{}-worker", self.id))
                .spawn_scoped(scope, move || serve_jobs(dispatcher, &backlog))
                .map_err(SessionError::Spawn)?;
            let writer_thread = thread::Builder::new()
                .name(format!("abci-session-{}-writer", self.id))
                .spawn_scoped(scope, move || response_writer.drain(&queue))
                .map_err(SessionError::Spawn)?;
            let read_result = self.read_requests(reader, &slots, &jobs);
            drop(jobs);
            drop(slots);
            let write_result = writer_thread
                .join()
                .map_err(|_| SessionError::WriterPanic)?;
            worker_thread
                .join()
                .map_err(|_| SessionError::WorkerPanic)?;
            Ok::<_, SessionError>((read_result, write_result))
        })?;

        let responses = write_result?;
        let requests = read_result?;
        debug!(
            target: SESSION_TARGET,
            session = self.id,
            requests,
            responses,
            "session finished"
        );
        Ok(SessionStats {
            requests,
            responses,
        })
    }

    fn read_requests<R: Read>(
        &self,
        reader: R,
        slots: &SyncSender<Slot>,
        jobs: &SyncSender<Job>,
    ) -> Result<u64, SessionError> {
        let mut frames = FrameReader::with_limit(reader, self.max_frame_bytes);
        let mut scheduled = 0_u64;
        loop {
            let Some(payload) = frames.read_frame()? else {
                debug!(target: SESSION_TARGET, session = self.id, "peer closed the connection");
                return Ok(scheduled);
            };
            if payload.is_empty() {
                trace!(target: SESSION_TARGET, session = self.id, "ignored empty frame");
                continue;
            }
            let request = self
                .codec
                .decode_request(&payload)
                .map_err(SessionError::Decode)?;
            trace!(
                target: SESSION_TARGET,
                session = self.id,
                kind = %request.kind(),
                "request received"
            );

            let slot = self.schedule(request, jobs);
            if slots.send(slot).is_err() {
                // The writer has stopped; its own error explains why.
                return Ok(scheduled);
            }
            scheduled += 1;
        }
    }

    fn schedule(&self, request: Request, jobs: &SyncSender<Job>) -> Slot {
        if Capability::of_request(&request) == Capability::Consensus {
            return Slot::Ready(self.dispatcher.dispatch(request));
        }

        let kind = request.kind();
        let (reply, pending) = mpsc::sync_channel(1);
        if jobs.send(Job { request, reply }).is_err() {
            // The returned job takes the reply sender with it, so the writer
            // answers this slot with an internal fault.
            warn!(
                target: SESSION_TARGET,
                session = self.id,
                %kind,
                "request worker has stopped"
            );
        }
        Slot::Pending {
            kind,
            reply: pending,
        }
    }
}

/// Runs queued requests one at a time until the reader hangs up.
fn serve_jobs<A: Application>(dispatcher: &Dispatcher<A>, backlog: &Receiver<Job>) {
    for Job { request, reply } in backlog {
        // The writer may already be gone; nothing to report then.
        let _ = reply.send(dispatcher.dispatch(request));
    }
}
