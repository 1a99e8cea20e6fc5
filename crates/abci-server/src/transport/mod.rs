//! Socket transport for consensus engine connections.
//!
//! A [`SocketListener`] binds one TCP or Unix endpoint and accepts connections
//! on a background thread, handing each accepted [`ConnectionStream`] to a
//! [`ConnectionHandler`] on its own thread. The transport knows nothing about
//! frames or messages.

mod errors;
mod listener;
mod stream;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub use self::listener::{ListenerHandle, SocketListener};
pub use self::stream::{ConnectionHandler, ConnectionStream};
#[cfg(test)]
pub(crate) use self::test_utils::PeerRecorder;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
