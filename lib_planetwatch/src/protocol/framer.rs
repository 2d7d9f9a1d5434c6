//! # Stream Framer
//!
//! Reassembles length-prefixed frames from the arbitrary chunks a TCP socket
//! hands back:
//!
//! ```text
//! +-------------------+--------------------------------------------+
//! | length (4 bytes)  | payload (length bytes)                     |
//! | u32 little-endian | u16 operandCount | i32 typeCode | body ... |
//! +-------------------+--------------------------------------------+
//! ```
//!
//! A chunk may hold no complete frame, exactly one, many, or the tail of one
//! frame followed by the head of the next. The framer appends every chunk to
//! an accumulation buffer, peels off each complete frame, and keeps the
//! incomplete remainder for the next call.
//!
//! ## Failure policy
//! A decode error (or an absurd length prefix) clears the whole accumulation
//! buffer and the framer starts over with the next chunk. Messages decoded
//! earlier in the same chunk have already been handed to the caller. This is
//! lossy: if the error did not sit on a frame boundary the next chunk may
//! begin mid-frame and produce further errors until the stream realigns.

#![forbid(unsafe_code)]

use bytes::{Buf, BytesMut};

use crate::protocol::messages::DecodedMessage;
use crate::protocol::reader::DecodeError;
use crate::protocol::registry::decode;

/// Size of the length prefix in front of every payload.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload accepted by default (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Framer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Length prefixes above this are treated as a framing error.
    pub max_frame_size: u32,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

/// Per-connection frame reassembly state.
#[derive(Debug, Default)]
pub struct StreamFramer {
    buffer: BytesMut,
    config: FramerConfig,
}

impl StreamFramer {
    pub fn new(config: FramerConfig) -> Self {
        Self {
            buffer: BytesMut::new(),
            config,
        }
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// # Push a Chunk
    ///
    /// Appends `chunk` and invokes `on_message` once per decoded frame, in
    /// wire order. Frames with unregistered type codes are skipped silently.
    ///
    /// # Returns
    /// The number of messages delivered, or the decode error that caused the
    /// accumulation buffer to be discarded.
    pub fn push<F>(&mut self, chunk: &[u8], mut on_message: F) -> Result<usize, DecodeError>
    where
        F: FnMut(DecodedMessage),
    {
        self.buffer.extend_from_slice(chunk);

        let mut delivered = 0;
        match self.drain(&mut on_message, &mut delivered) {
            Ok(()) => Ok(delivered),
            Err(e) => {
                self.buffer.clear();
                Err(e)
            }
        }
    }

    fn drain<F>(&mut self, on_message: &mut F, delivered: &mut usize) -> Result<(), DecodeError>
    where
        F: FnMut(DecodedMessage),
    {
        while self.buffer.len() >= LENGTH_PREFIX_SIZE {
            let length = u32::from_le_bytes([self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]]);
            if length > self.config.max_frame_size {
                return Err(DecodeError::FrameTooLarge {
                    length,
                    max: self.config.max_frame_size,
                });
            }

            // Wait for the rest of the payload; the prefix stays in the buffer.
            if self.buffer.len() - LENGTH_PREFIX_SIZE < length as usize {
                break;
            }

            self.buffer.advance(LENGTH_PREFIX_SIZE);
            let payload = self.buffer.split_to(length as usize);
            if let Some(message) = decode(&payload)? {
                on_message(message);
                *delivered += 1;
            }
        }
        Ok(())
    }
}
