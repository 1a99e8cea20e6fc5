//! Request routing to the application's capability groups.

use std::sync::Arc;

use abci_types::{
    MessageKind, QueryRequest, QueryResponse, Reply, Request, Response, ResponseError,
    ResponseValue,
};
use tracing::debug;

use super::guard::guarded;
use super::{Capability, DISPATCH_TARGET};
use crate::application::Application;
use crate::lifecycle::BlockLifecycle;

/// Routes requests to one shared application.
///
/// Dispatchers are cheap to clone; every clone shares the application and the
/// lifecycle tracker.
#[derive(Debug)]
pub struct Dispatcher<A> {
    app: Arc<A>,
    lifecycle: Arc<BlockLifecycle>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            app: Arc::clone(&self.app),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl<A: Application> Dispatcher<A> {
    /// Creates a dispatcher over `app`, sequenced by `lifecycle`.
    #[must_use]
    pub const fn new(app: Arc<A>, lifecycle: Arc<BlockLifecycle>) -> Self {
        Self { app, lifecycle }
    }

    /// Shared application.
    #[must_use]
    pub const fn application(&self) -> &Arc<A> {
        &self.app
    }

    /// Shared lifecycle tracker.
    #[must_use]
    pub const fn lifecycle(&self) -> &Arc<BlockLifecycle> {
        &self.lifecycle
    }

    /// Handles one request and returns the response of the same kind.
    ///
    /// Never fails. An application reply keeps its payload next to its error
    /// fields; lifecycle violations and height errors, which the application
    /// never sees, come back with the neutral payload.
    pub fn dispatch(&self, request: Request) -> Response {
        let kind = request.kind();
        let capability = Capability::of_request(&request);
        let response = match self.route(request) {
            Ok(reply) => Response::from_reply(reply),
            Err(fault) => Response::failed(kind, fault),
        };
        match &response.error {
            Some(error) if !error.is_ok() => debug!(
                target: DISPATCH_TARGET,
                %kind,
                %capability,
                code = error.code,
                codespace = %error.codespace,
                "request failed"
            ),
            _ => debug!(target: DISPATCH_TARGET, %kind, %capability, "request handled"),
        }
        response
    }

    /// `Err` carries a fault raised before the application was called.
    fn route(&self, request: Request) -> Result<Reply<ResponseValue>, ResponseError> {
        let app = self.app.as_ref();
        let reply = match request {
            Request::Echo(request) => {
                guarded(MessageKind::Echo, || app.echo(request)).map(ResponseValue::Echo)
            }
            Request::Flush => {
                guarded(MessageKind::Flush, || app.flush()).map(|()| ResponseValue::Flush)
            }
            Request::Info(request) => {
                let reply = guarded(MessageKind::Info, || app.info(request));
                if reply.is_ok() {
                    self.lifecycle.observe_info(&reply.value);
                }
                reply.map(ResponseValue::Info)
            }
            Request::SetOption(request) => {
                guarded(MessageKind::SetOption, || app.set_option(request))
                    .map(ResponseValue::SetOption)
            }
            Request::Query(request) => self.query(request)?.map(ResponseValue::Query),
            Request::CheckTx(request) => {
                guarded(MessageKind::CheckTx, || app.check_tx(request)).map(ResponseValue::CheckTx)
            }
            Request::InitChain(request) => self
                .lifecycle
                .init_chain(request, |request| {
                    guarded(MessageKind::InitChain, || app.init_chain(request))
                })?
                .map(ResponseValue::InitChain),
            Request::BeginBlock(request) => self
                .lifecycle
                .begin_block(request, |request| {
                    guarded(MessageKind::BeginBlock, || app.begin_block(request))
                })?
                .map(ResponseValue::BeginBlock),
            Request::DeliverTx(request) => self
                .lifecycle
                .deliver_tx(request, |request| {
                    guarded(MessageKind::DeliverTx, || app.deliver_tx(request))
                })?
                .map(ResponseValue::DeliverTx),
            Request::EndBlock(request) => self
                .lifecycle
                .end_block(request, |request| {
                    guarded(MessageKind::EndBlock, || app.end_block(request))
                })?
                .map(ResponseValue::EndBlock),
            Request::Commit => self
                .lifecycle
                .commit(|| guarded(MessageKind::Commit, || app.commit()))?
                .map(ResponseValue::Commit),
            Request::ListSnapshots(_) => {
                guarded(MessageKind::ListSnapshots, || app.list_snapshots())
                    .map(ResponseValue::ListSnapshots)
            }
            Request::OfferSnapshot(request) => {
                guarded(MessageKind::OfferSnapshot, || app.offer_snapshot(request))
                    .map(ResponseValue::OfferSnapshot)
            }
            Request::LoadSnapshotChunk(request) => {
                guarded(MessageKind::LoadSnapshotChunk, || {
                    app.load_snapshot_chunk(request)
                })
                .map(ResponseValue::LoadSnapshotChunk)
            }
            Request::ApplySnapshotChunk(request) => {
                guarded(MessageKind::ApplySnapshotChunk, || {
                    app.apply_snapshot_chunk(request)
                })
                .map(ResponseValue::ApplySnapshotChunk)
            }
        };
        Ok(reply)
    }

    fn query(&self, mut request: QueryRequest) -> Result<Reply<QueryResponse>, ResponseError> {
        let height = self.lifecycle.committed_window().resolve(request.height)?;
        request.height = height;
        let mut reply = guarded(MessageKind::Query, || self.app.query(request));
        if reply.value.height == 0 {
            reply.value.height = height;
        }
        Ok(reply)
    }
}
