//! # Little-Endian Payload Reader
//!
//! A bounds-checked cursor over a single frame payload. Every read verifies
//! that enough bytes remain before touching the buffer, so a malformed or
//! truncated payload surfaces as a [`DecodeError`] instead of a panic.

#![forbid(unsafe_code)]

use bytes::Buf;
use thiserror::Error;

/// Structural decoding failures.
///
/// Unknown type codes are *not* errors; the registry reports them as an
/// absent message so newer servers can add message kinds freely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The payload ended before a field could be read.
    #[error("truncated payload reading {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Name of the field being decoded.
        field: &'static str,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },

    /// A length prefix announced a frame larger than the configured limit.
    #[error("frame length {length} exceeds maximum {max}")]
    FrameTooLarge {
        /// Announced payload length.
        length: u32,
        /// Configured maximum.
        max: u32,
    },
}

/// Cursor over a borrowed payload.
pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    /// Wraps `buf` for reading from its first byte.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_i8(&mut self, field: &'static str) -> Result<i8, DecodeError> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.ensure(field, 2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.ensure(field, 8)?;
        Ok(self.buf.get_i64_le())
    }

    /// Reads a `u16` length followed by that many single-byte characters.
    ///
    /// Identifiers and addresses on this protocol are ASCII; stray high bytes
    /// are replaced rather than rejected.
    pub fn read_ascii(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u16(field)? as usize;
        self.ensure(field, len)?;
        let text = String::from_utf8_lossy(&self.buf[..len]).into_owned();
        self.buf.advance(len);
        Ok(text)
    }

    /// Reads a `u32` count followed by that many `u32` values.
    pub fn read_u32_list(&mut self, field: &'static str) -> Result<Vec<u32>, DecodeError> {
        let count = self.read_u32(field)? as usize;
        self.ensure(field, count.saturating_mul(4))?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.buf.get_u32_le());
        }
        Ok(values)
    }

    /// Reads a `u32` element count and caps the pre-allocation by what the
    /// remaining bytes could possibly hold.
    pub fn read_count(&mut self, field: &'static str, min_entry_size: usize) -> Result<(usize, usize), DecodeError> {
        let count = self.read_u32(field)? as usize;
        let capacity = count.min(self.remaining() / min_entry_size.max(1));
        Ok((count, capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let mut data = Vec::new();
        data.push(0xFFu8);
        data.extend_from_slice(&0x1234u16.to_le_bytes());
        data.extend_from_slice(&(-5i32).to_le_bytes());
        data.extend_from_slice(&i64::MIN.to_le_bytes());

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_i8("a").unwrap(), -1);
        assert_eq!(reader.read_u16("b").unwrap(), 0x1234);
        assert_eq!(reader.read_i32("c").unwrap(), -5);
        assert_eq!(reader.read_i64("d").unwrap(), i64::MIN);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_field_reports_context() {
        let data = [1u8, 2];
        let mut reader = ByteReader::new(&data);
        let err = reader.read_u32("serverId").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "serverId",
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn ascii_string_respects_explicit_length() {
        let mut data = Vec::new();
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(b"abcdef");
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_ascii("sceneId").unwrap(), "abc");
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn oversized_list_count_is_rejected_without_allocating() {
        let mut data = Vec::new();
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_u32_list("servers"),
            Err(DecodeError::Truncated { field: "servers", .. })
        ));
    }
}
