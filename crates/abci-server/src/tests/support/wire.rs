//! Framing helpers for driving sessions from byte buffers.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use abci_types::{
    BeginBlockRequest, Codec, FrameReader, Header, JsonCodec, PublicKey, Request, Response,
    ValidatorUpdate, write_frame,
};

/// Writer whose contents stay readable after a session consumes it.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Copies everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().expect("shared buffer mutex poisoned").clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("shared buffer mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Frames `requests` with the JSON codec.
pub fn encode_requests(requests: &[Request]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for request in requests {
        let payload = JsonCodec.encode_request(request).expect("encode request");
        write_frame(&mut bytes, &payload).expect("frame request");
    }
    bytes
}

/// Reads every framed response in `bytes`.
pub fn decode_responses(bytes: &[u8]) -> Vec<Response> {
    let mut frames = FrameReader::new(bytes);
    let mut responses = Vec::new();
    while let Some(payload) = frames.read_frame().expect("read response frame") {
        responses.push(JsonCodec.decode_response(&payload).expect("decode response"));
    }
    responses
}

/// Requests executing one block at `height` on top of `app_hash`.
pub fn run_block(height: u64, app_hash: &[u8], txs: &[&str]) -> Vec<Request> {
    let mut requests = vec![Request::BeginBlock(BeginBlockRequest::for_header(
        Header::at("test-chain", height, app_hash),
    ))];
    requests.extend(txs.iter().map(|tx| Request::deliver_tx(tx.as_bytes())));
    requests.push(Request::end_block(height));
    requests.push(Request::Commit);
    requests
}

/// Validator update for a one-byte key.
pub fn validator(key: u8, power: u64) -> ValidatorUpdate {
    ValidatorUpdate::new(PublicKey::ed25519(vec![key; 32]), power)
}
