//! # Planet Wire Protocol
//!
//! Everything needed to turn raw planet-server socket bytes into typed
//! messages. The protocol is little-endian throughout:
//!
//! - a stream of frames, each a `u32` length followed by that many bytes;
//! - each payload starts with a `u16` operand count and an `i32` type code;
//! - the type code is the CRC of the message's canonical name and selects the
//!   body layout.
//!
//! ## Contained Modules:
//! - **`crc`**: the compile-time name hash used for type codes.
//! - **`reader`**: bounds-checked little-endian cursor and `DecodeError`.
//! - **`messages`**: typed payloads for every registered message kind.
//! - **`registry`**: type code → decoder table and the `decode` entry point.
//! - **`framer`**: frame reassembly over arbitrary socket chunking.
//! - **`encoder`**: the inverse direction, for fake planets and captures.

#![forbid(unsafe_code)]

pub mod crc;
pub mod encoder;
pub mod framer;
pub mod messages;
pub mod reader;
pub mod registry;

pub use framer::{FramerConfig, StreamFramer, MAX_FRAME_SIZE};
pub use messages::{
    DecodedMessage, FrameEnd, GameServerStatus, MessageHeader, PlanetMessage, PlanetNodeStatusEntry,
    PlanetObjectStatusEntry,
};
pub use reader::DecodeError;
pub use registry::{decode, MessageKind};
