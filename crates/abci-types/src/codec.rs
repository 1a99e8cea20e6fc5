//! Message codec boundary.
//!
//! The protocol core never looks inside frame payloads itself: it hands them
//! to a [`Codec`]. [`JsonCodec`] encodes messages with `serde_json`; a binary
//! schema can replace it without touching the server.

use std::error::Error as StdError;

use thiserror::Error;

use crate::messages::{Request, Response};

/// Boxed source error from a codec implementation.
pub type CodecSource = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised by a [`Codec`].
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload could not be decoded into the expected message.
    #[error("failed to decode {message}: {source}")]
    Decode {
        /// Name of the message type being decoded.
        message: &'static str,
        /// Underlying failure.
        #[source]
        source: CodecSource,
    },
    /// Message could not be encoded.
    #[error("failed to encode {message}: {source}")]
    Encode {
        /// Name of the message type being encoded.
        message: &'static str,
        /// Underlying failure.
        #[source]
        source: CodecSource,
    },
}

impl CodecError {
    /// Wraps a decode failure.
    pub fn decode(message: &'static str, source: impl Into<CodecSource>) -> Self {
        Self::Decode {
            message,
            source: source.into(),
        }
    }

    /// Wraps an encode failure.
    pub fn encode(message: &'static str, source: impl Into<CodecSource>) -> Self {
        Self::Encode {
            message,
            source: source.into(),
        }
    }
}

/// Pure function pair translating frame payloads to messages and back.
///
/// The server side uses `decode_request` / `encode_response`; clients and test
/// harnesses use the mirror pair.
pub trait Codec: Send + Sync + 'static {
    /// Decodes a request payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] when the payload is not a valid request.
    fn decode_request(&self, payload: &[u8]) -> Result<Request, CodecError>;

    /// Encodes a response payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] when the response cannot be encoded.
    fn encode_response(&self, response: &Response) -> Result<Vec<u8>, CodecError>;

    /// Encodes a request payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] when the request cannot be encoded.
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError>;

    /// Decodes a response payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] when the payload is not a valid response.
    fn decode_response(&self, payload: &[u8]) -> Result<Response, CodecError>;
}

/// Codec encoding messages as JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn decode_request(&self, payload: &[u8]) -> Result<Request, CodecError> {
        serde_json::from_slice(payload).map_err(|source| CodecError::decode("request", source))
    }

    fn encode_response(&self, response: &Response) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(response).map_err(|source| CodecError::encode("response", source))
    }

    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(request).map_err(|source| CodecError::encode("request", source))
    }

    fn decode_response(&self, payload: &[u8]) -> Result<Response, CodecError> {
        serde_json::from_slice(payload).map_err(|source| CodecError::decode("response", source))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::messages::*;
    use crate::{
        ConsensusParams, Event, Header, PublicKey, ResponseError, Snapshot, ValidatorUpdate,
    };

    fn every_request() -> Vec<Request> {
        vec![
            Request::echo("ping"),
            Request::Flush,
            Request::Info(InfoRequest {
                version: "0.34".to_owned(),
                block_version: 11,
                ..InfoRequest::default()
            }),
            Request::SetOption(SetOptionRequest {
                key: "min_gas".to_owned(),
                value: "5".to_owned(),
            }),
            Request::Query(QueryRequest {
                data: b"name".to_vec(),
                path: "/store".to_owned(),
                height: 3,
                prove: true,
            }),
            Request::check_tx(b"a=1".to_vec()),
            Request::CheckTx(CheckTxRequest {
                tx: b"a=1".to_vec(),
                kind: CheckTxKind::Recheck,
            }),
            Request::InitChain(InitChainRequest {
                time: Some(Duration::from_secs(1_600_000_000)),
                chain_id: "test-chain".to_owned(),
                consensus_params: Some(ConsensusParams::default()),
                validators: vec![ValidatorUpdate::new(PublicKey::ed25519(vec![9]), 10)],
                app_state_bytes: b"{}".to_vec(),
                initial_height: 1,
            }),
            Request::BeginBlock(BeginBlockRequest {
                hash: vec![1; 4],
                header: Some(Header::at("test-chain", 1, Vec::new())),
                ..BeginBlockRequest::default()
            }),
            Request::deliver_tx(b"b=2".to_vec()),
            Request::end_block(4),
            Request::Commit,
            Request::ListSnapshots(ListSnapshotsRequest {}),
            Request::OfferSnapshot(OfferSnapshotRequest {
                snapshot: Some(Snapshot {
                    height: 4,
                    format: 1,
                    chunks: 2,
                    hash: vec![7; 4],
                    metadata: Vec::new(),
                }),
                app_hash: vec![8; 4],
            }),
            Request::LoadSnapshotChunk(LoadSnapshotChunkRequest {
                height: 4,
                format: 1,
                chunk: 0,
            }),
            Request::ApplySnapshotChunk(ApplySnapshotChunkRequest {
                index: 1,
                chunk: b"chunk".to_vec(),
                sender: "peer-1".to_owned(),
            }),
        ]
    }

    fn every_response() -> Vec<Response> {
        let rejected = ResponseError::new(2, "kvstore").with_log("bad tx");
        vec![
            Response::ok(ResponseValue::Echo(EchoResponse {
                message: "ping".to_owned(),
            })),
            Response::ok(ResponseValue::Flush),
            Response::ok(ResponseValue::Info(InfoResponse {
                last_block_height: 3,
                last_block_app_hash: vec![3; 8],
                ..InfoResponse::default()
            })),
            Response::ok(ResponseValue::SetOption(SetOptionResponse::default())),
            Response::ok(ResponseValue::Query(QueryResponse {
                key: b"name".to_vec(),
                value: b"satoshi".to_vec(),
                height: 3,
                ..QueryResponse::default()
            })),
            Response::new(
                ResponseValue::CheckTx(CheckTxResponse {
                    gas_wanted: 10,
                    ..CheckTxResponse::default()
                }),
                Some(rejected.clone()),
            ),
            Response::ok(ResponseValue::InitChain(InitChainResponse::default())),
            Response::ok(ResponseValue::BeginBlock(BeginBlockResponse {
                events: vec![Event::new("begin").with_attribute("height", "1")],
            })),
            Response::new(
                ResponseValue::DeliverTx(DeliverTxResponse {
                    gas_used: 4,
                    ..DeliverTxResponse::default()
                }),
                Some(rejected),
            ),
            Response::ok(ResponseValue::EndBlock(EndBlockResponse {
                validator_updates: vec![ValidatorUpdate::new(PublicKey::ed25519(vec![1, 2]), 0)],
                ..EndBlockResponse::default()
            })),
            Response::ok(ResponseValue::Commit(CommitResponse {
                data: vec![5; 8],
                retain_height: 1,
            })),
            Response::ok(ResponseValue::ListSnapshots(ListSnapshotsResponse {
                snapshots: vec![Snapshot::default()],
            })),
            Response::ok(ResponseValue::OfferSnapshot(OfferSnapshotResponse {
                result: OfferSnapshotResult::RejectFormat,
            })),
            Response::ok(ResponseValue::LoadSnapshotChunk(LoadSnapshotChunkResponse {
                chunk: b"chunk".to_vec(),
            })),
            Response::ok(ResponseValue::ApplySnapshotChunk(ApplySnapshotChunkResponse {
                result: ApplySnapshotChunkResult::Retry,
                refetch_chunks: vec![0, 2],
                reject_senders: vec!["peer-2".to_owned()],
            })),
            Response::failed(
                MessageKind::Exception,
                ResponseError::internal_fault("encode failed"),
            ),
        ]
    }

    #[test]
    fn every_request_survives_the_wire() {
        for request in every_request() {
            let bytes = JsonCodec.encode_request(&request).expect("encode");
            let decoded = JsonCodec.decode_request(&bytes).expect("decode");
            assert_eq!(decoded, request, "{} changed on the wire", request.kind());
        }
    }

    #[test]
    fn every_response_survives_the_wire() {
        for response in every_response() {
            let bytes = JsonCodec.encode_response(&response).expect("encode");
            let decoded = JsonCodec.decode_response(&bytes).expect("decode");
            assert_eq!(decoded, response, "{} changed on the wire", response.kind());
        }
    }

    #[test]
    fn recheck_kind_is_not_mistaken_for_the_tag() {
        let request = JsonCodec
            .decode_request(br#"{"kind":"check_tx","body":{"tx":[120],"kind":"recheck"}}"#)
            .expect("decode check_tx");
        let Request::CheckTx(check) = request else {
            panic!("expected check_tx, got {request:?}");
        };
        assert_eq!(check.kind, CheckTxKind::Recheck);
        assert_eq!(check.tx, b"x");
    }

    #[test]
    fn decodes_requests_written_by_hand() {
        let request = JsonCodec
            .decode_request(br#"{"kind":"end_block","body":{"height":4}}"#)
            .expect("decode end_block");
        assert_eq!(request.kind(), MessageKind::EndBlock);
        assert_eq!(request, Request::end_block(4));
    }

    #[test]
    fn rejects_unknown_request_kinds() {
        let error = JsonCodec
            .decode_request(br#"{"kind":"snapshot"}"#)
            .expect_err("unknown kind must fail");
        assert!(matches!(error, CodecError::Decode { message: "request", .. }));
    }
}
