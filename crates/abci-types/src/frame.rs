//! Length-delimited framing.
//!
//! Every frame is an unsigned LEB128 varint holding the payload length,
//! followed by the payload itself. A stream that ends exactly on a frame
//! boundary is a clean close; any other end of stream is a truncated frame.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Default ceiling on a single frame's payload.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// A `u64` never needs more than ten varint bytes.
const MAX_VARINT_BYTES: usize = 10;

/// Errors raised while reading frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Declared payload exceeds the configured limit.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Declared payload length.
        size: u64,
        /// Configured limit.
        max: usize,
    },
    /// Length prefix does not terminate within ten bytes or overflows `u64`.
    #[error("frame length prefix is malformed")]
    MalformedLength,
    /// Stream ended inside a frame.
    #[error("stream ended inside a frame")]
    Truncated,
    /// Underlying read failed.
    #[error("failed to read frame: {0}")]
    Io(#[from] io::Error),
}

/// Reads frames from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    /// Wraps `reader` with the default frame limit.
    pub const fn new(reader: R) -> Self {
        Self::with_limit(reader, DEFAULT_MAX_FRAME_BYTES)
    }

    /// Wraps `reader` with an explicit frame limit.
    pub const fn with_limit(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
        }
    }

    /// Reads the next frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between frames. A
    /// zero-length frame yields an empty payload.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] on a malformed or oversized length prefix, a
    /// truncated payload, or an IO failure.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(length) = self.read_length()? else {
            return Ok(None);
        };
        let size = usize::try_from(length).map_err(|_| FrameError::TooLarge {
            size: length,
            max: self.max_frame_bytes,
        })?;
        if size > self.max_frame_bytes {
            return Err(FrameError::TooLarge {
                size: length,
                max: self.max_frame_bytes,
            });
        }

        let mut payload = vec![0_u8; size];
        self.reader
            .read_exact(&mut payload)
            .map_err(|error| match error.kind() {
                io::ErrorKind::UnexpectedEof => FrameError::Truncated,
                _ => FrameError::Io(error),
            })?;
        Ok(Some(payload))
    }

    /// Consumes the frame reader, returning the inner stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_length(&mut self) -> Result<Option<u64>, FrameError> {
        let mut value = 0_u64;
        for index in 0..MAX_VARINT_BYTES {
            let byte = match self.read_byte()? {
                Some(byte) => byte,
                None if index == 0 => return Ok(None),
                None => return Err(FrameError::Truncated),
            };
            if index == MAX_VARINT_BYTES - 1 && byte > 1 {
                return Err(FrameError::MalformedLength);
            }
            value |= u64::from(byte & 0x7f) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Err(FrameError::MalformedLength)
    }

    fn read_byte(&mut self) -> Result<Option<u8>, FrameError> {
        let mut byte = [0_u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(FrameError::Io(error)),
            }
        }
    }
}

/// Appends the varint encoding of `length` to `out`.
pub fn encode_length(mut length: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (length & 0x7f) as u8;
        length >>= 7;
        if length == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Writes `payload` as one frame. The caller decides when to flush.
///
/// # Errors
///
/// Returns any error raised by the writer.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let mut prefix = Vec::with_capacity(MAX_VARINT_BYTES);
    encode_length(payload.len() as u64, &mut prefix);
    writer.write_all(&prefix)?;
    writer.write_all(payload)
}
