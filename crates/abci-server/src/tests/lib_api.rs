//! Tests exercising the crate's public surface.

use std::sync::Arc;

use abci_types::{MessageKind, Request};

use super::support::{RecordingApp, RecordingHealthReporter, encode_requests};
use crate::{
    Capability, Phase, QUEUE_DEPTH, Server, ServerError, StructuredHealthReporter,
};

#[test]
fn serving_without_endpoints_is_refused() {
    let server = Server::new(RecordingApp::new());
    let error = server.serve(&[]).expect_err("serve should fail");
    assert!(matches!(error, ServerError::NoEndpoints));
}

#[test]
fn a_fresh_server_waits_for_genesis() {
    let server = Server::new(RecordingApp::new())
        .with_reporter(Arc::new(StructuredHealthReporter::new()))
        .with_max_frame_bytes(1024);
    assert_eq!(server.lifecycle().phase(), Phase::Uninitialized);
    assert!(server.application().calls().is_empty());
}

#[test]
fn capability_groups_cover_every_request() {
    assert_eq!(Capability::of_kind(MessageKind::Flush), Some(Capability::Consensus));
    assert_eq!(Capability::of_kind(MessageKind::SetOption), Some(Capability::Info));
    assert_eq!(Capability::of_kind(MessageKind::CheckTx), Some(Capability::Mempool));
    assert_eq!(
        Capability::of_kind(MessageKind::ApplySnapshotChunk),
        Some(Capability::Snapshot)
    );
    assert!(QUEUE_DEPTH > 0);
}

#[cfg(unix)]
#[test]
fn serve_connection_runs_one_session_to_completion() {
    use std::io::{Read, Write};
    use std::net::Shutdown;
    use std::os::unix::net::UnixStream;

    use crate::transport::ConnectionStream;

    let reporter = Arc::new(RecordingHealthReporter::default());
    let server = Server::new(RecordingApp::new()).with_reporter(reporter.clone());
    let (mut client, server_side) = UnixStream::pair().expect("socket pair");

    client
        .write_all(&encode_requests(&[Request::echo("one"), Request::Flush]))
        .expect("write requests");
    client.shutdown(Shutdown::Write).expect("close write half");

    let stats = server
        .serve_connection(ConnectionStream::Unix(server_side))
        .expect("session should end cleanly");
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.responses, 2);

    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).expect("read responses");
    let kinds: Vec<_> = super::support::decode_responses(&bytes)
        .iter()
        .map(abci_types::Response::kind)
        .collect();
    assert_eq!(kinds, [MessageKind::Echo, MessageKind::Flush]);
    assert_eq!(reporter.events().len(), 2, "open and close expected");
}
