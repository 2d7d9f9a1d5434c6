//! # Message Type CRC
//!
//! Planet servers do not tag messages with an explicit discriminator byte.
//! Instead every payload carries the CRC of the message's canonical name
//! (e.g. `"FrameEndMessage"`), and the receiver dispatches on that value.
//!
//! The hash is the MSB-first CRC-32 with polynomial `0x04C11DB7`, an initial
//! register of `0xFFFFFFFF` and a final inversion, catalogued as CRC-32/BZIP2.
//! The `crc` crate's checksum is a `const fn`, so the dispatch table in
//! `registry.rs` is resolved at compile time.

#![forbid(unsafe_code)]

use crc::{Crc, CRC_32_BZIP2};

const TYPE_CODE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_BZIP2);

/// Computes the 32-bit CRC of `data`.
pub const fn crc32(data: &[u8]) -> u32 {
    TYPE_CODE_CRC.checksum(data)
}

/// Computes the signed type code carried in a message header for the given
/// canonical message name.
pub const fn type_code(name: &str) -> i32 {
    crc32(name.as_bytes()) as i32
}
