//! # Message Registry
//!
//! Maps the 32-bit type code found in every payload header to the decoder for
//! that message's body. The table is a `match` over constants computed at
//! compile time from the canonical message names (see `crc.rs`), so adding a
//! message kind is a compile-checked change: `MessageKind` is matched
//! exhaustively everywhere a kind is consumed.
//!
//! Unrecognised type codes are not errors. [`decode`] reports them as
//! `Ok(None)` and the caller simply drops the payload, which keeps the watcher
//! compatible with servers that emit message kinds it does not know about.

#![forbid(unsafe_code)]

use std::fmt;

use crate::protocol::crc::type_code;
use crate::protocol::messages::{DecodedMessage, MessageHeader, PlanetMessage};
use crate::protocol::reader::{ByteReader, DecodeError};

const PLANET_NODE_STATUS: i32 = type_code(MessageKind::PlanetNodeStatus.name());
const PLANET_OBJECT_STATUS: i32 = type_code(MessageKind::PlanetObjectStatus.name());
const GAME_SERVER_STATUS: i32 = type_code(MessageKind::GameServerStatus.name());
const FRAME_END: i32 = type_code(MessageKind::FrameEnd.name());

/// Every message kind the watcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    PlanetNodeStatus,
    PlanetObjectStatus,
    GameServerStatus,
    FrameEnd,
}

impl MessageKind {
    /// All registered kinds, in registry order.
    pub const ALL: [MessageKind; 4] = [
        MessageKind::PlanetNodeStatus,
        MessageKind::PlanetObjectStatus,
        MessageKind::GameServerStatus,
        MessageKind::FrameEnd,
    ];

    /// Canonical name hashed into the type code.
    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::PlanetNodeStatus => "PlanetNodeStatusMessage",
            MessageKind::PlanetObjectStatus => "PlanetObjectStatusMessage",
            MessageKind::GameServerStatus => "GameServerStatus",
            MessageKind::FrameEnd => "FrameEndMessage",
        }
    }

    /// Header type code for this kind.
    pub const fn type_code(self) -> i32 {
        match self {
            MessageKind::PlanetNodeStatus => PLANET_NODE_STATUS,
            MessageKind::PlanetObjectStatus => PLANET_OBJECT_STATUS,
            MessageKind::GameServerStatus => GAME_SERVER_STATUS,
            MessageKind::FrameEnd => FRAME_END,
        }
    }

    /// Operand count a server writes for this kind: the message type plus one
    /// per top-level field.
    pub const fn operand_count(self) -> u16 {
        match self {
            MessageKind::PlanetNodeStatus | MessageKind::PlanetObjectStatus => 2,
            MessageKind::GameServerStatus => 6,
            MessageKind::FrameEnd => 4,
        }
    }

    /// Looks up the kind registered for a type code.
    pub const fn from_type_code(code: i32) -> Option<MessageKind> {
        match code {
            PLANET_NODE_STATUS => Some(MessageKind::PlanetNodeStatus),
            PLANET_OBJECT_STATUS => Some(MessageKind::PlanetObjectStatus),
            GAME_SERVER_STATUS => Some(MessageKind::GameServerStatus),
            FRAME_END => Some(MessageKind::FrameEnd),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// # Decode a Frame Payload
///
/// Reads the header (`u16` operand count, `i32` type code) and, if the type
/// code is registered, the message body.
///
/// # Returns
/// - `Ok(Some(message))` for a recognised, well-formed payload.
/// - `Ok(None)` for an unrecognised type code.
/// - `Err(DecodeError)` when the header or a registered body is truncated.
///
/// Bytes left over after a registered body are ignored.
pub fn decode(payload: &[u8]) -> Result<Option<DecodedMessage>, DecodeError> {
    let mut reader = ByteReader::new(payload);
    let header = MessageHeader {
        operand_count: reader.read_u16("operandCount")?,
        type_code: reader.read_i32("typeCode")?,
    };

    let Some(kind) = MessageKind::from_type_code(header.type_code) else {
        log::debug!("Ignoring payload with unregistered type code {:#010x}", header.type_code);
        return Ok(None);
    };

    let message = PlanetMessage::decode_body(kind, &mut reader)?;
    if reader.remaining() > 0 {
        log::trace!("{} carried {} trailing bytes", kind, reader.remaining());
    }
    Ok(Some(DecodedMessage { header, message }))
}
