//! Wire-level vocabulary shared by the ABCI server and its clients.
//!
//! The crate defines the closed request and response sum types exchanged with
//! the consensus engine, the immutable value records they carry, the
//! structured [`ResponseError`] attached to every response, the [`Reply`]
//! pair application calls return, and the boundary used to move messages over
//! a byte stream:
//!
//! - [`frame`] splits a stream into length-delimited frames (unsigned varint
//!   prefix followed by the payload).
//! - [`codec`] turns frame payloads into typed messages and back. The
//!   [`JsonCodec`] is the default implementation; other schemas plug in by
//!   implementing [`Codec`].

pub mod codec;
mod error;
pub mod frame;
mod messages;
mod records;
mod reply;

pub use codec::{Codec, CodecError, JsonCodec};
pub use error::{ResponseError, codes};
pub use frame::{DEFAULT_MAX_FRAME_BYTES, FrameError, FrameReader, write_frame};
pub use messages::*;
pub use records::*;
pub use reply::Reply;
