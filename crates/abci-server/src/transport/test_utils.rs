//! Connection handler double for listener tests.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use super::{ConnectionHandler, ConnectionStream};

/// Forwards the peer description of every accepted connection to a channel.
pub(crate) struct PeerRecorder {
    peers: Sender<String>,
}

impl PeerRecorder {
    pub(crate) fn new() -> (Self, AcceptedPeers) {
        let (sender, receiver) = mpsc::channel();
        (
            Self { peers: sender },
            AcceptedPeers(receiver),
        )
    }
}

impl ConnectionHandler for PeerRecorder {
    fn handle(&self, stream: ConnectionStream) {
        // The test may have stopped listening already.
        let _ = self.peers.send(stream.peer());
    }
}

/// Receiving side of a [`PeerRecorder`].
pub(crate) struct AcceptedPeers(Receiver<String>);

impl AcceptedPeers {
    /// Waits for `count` connections, returning their peer descriptions.
    pub(crate) fn take(&self, count: usize) -> Vec<String> {
        (0..count)
            .map_while(|_| self.0.recv_timeout(Duration::from_secs(2)).ok())
            .collect()
    }
}
