//! # Planet Telemetry Messages
//!
//! Typed payloads for the four message kinds a planet server emits. Each
//! struct knows how to read its own body from a [`ByteReader`]; the header
//! (operand count + type code) has already been consumed by the registry.
//!
//! All structs serialize with camelCase keys for downstream JSON consumers.
//! Network ids are serialized as decimal strings: they are full signed 64-bit
//! values and must not be squeezed through a double-precision number.

#![forbid(unsafe_code)]

use serde::{Serialize, Serializer};

use crate::protocol::reader::{ByteReader, DecodeError};
use crate::protocol::registry::MessageKind;
use crate::utils::cell_index::get_planet_cell_index;

/// Header common to every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub operand_count: u16,
    pub type_code: i32,
}

/// Load and interest state of one scene cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetNodeStatusEntry {
    pub location_x: i32,
    pub location_z: i32,
    pub is_loaded: i8,
    /// Game servers that currently have the node loaded.
    pub servers: Vec<u32>,
    /// Game servers subscribed to the node.
    pub subscriptions: Vec<u32>,
}

impl PlanetNodeStatusEntry {
    /// Smallest possible encoded entry: two coordinates, the flag and two empty lists.
    const MIN_ENCODED_SIZE: usize = 4 + 4 + 1 + 4 + 4;

    /// Grid cell this node reports for; the node-status cache key.
    pub fn cell_index(&self) -> i64 {
        get_planet_cell_index(self.location_x, self.location_z)
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            location_x: reader.read_i32("locationX")?,
            location_z: reader.read_i32("locationZ")?,
            is_loaded: reader.read_i8("isLoaded")?,
            servers: reader.read_u32_list("servers")?,
            subscriptions: reader.read_u32_list("subscriptions")?,
        })
    }
}

/// Position and simulation status of one networked object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetObjectStatusEntry {
    #[serde(serialize_with = "serialize_network_id")]
    pub network_id: i64,
    pub location_x: i32,
    pub location_z: i32,
    pub authoritative_server: u32,
    pub interest_radius: i32,
    /// Positive when the object has left the planet.
    pub delete_object: i32,
    pub object_type_tag: i32,
    pub level: i32,
    pub hibernating: i8,
    pub template_crc: i32,
    pub ai_activity: i32,
    pub creation_type: i32,
}

impl PlanetObjectStatusEntry {
    /// The network id, ten 4-byte fields and the hibernation flag.
    const ENCODED_SIZE: usize = 8 + 4 * 10 + 1;

    /// Whether this update tombstones the object.
    pub fn is_deleted(&self) -> bool {
        self.delete_object > 0
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            network_id: reader.read_i64("networkId")?,
            location_x: reader.read_i32("locationX")?,
            location_z: reader.read_i32("locationZ")?,
            authoritative_server: reader.read_u32("authoritativeServer")?,
            interest_radius: reader.read_i32("interestRadius")?,
            delete_object: reader.read_i32("deleteObject")?,
            object_type_tag: reader.read_i32("objectTypeTag")?,
            level: reader.read_i32("level")?,
            hibernating: reader.read_i8("hibernating")?,
            template_crc: reader.read_i32("templateCrc")?,
            ai_activity: reader.read_i32("aiActivity")?,
            creation_type: reader.read_i32("creationType")?,
        })
    }
}

/// Health report of one game server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameServerStatus {
    pub is_online: i8,
    pub ip_address: String,
    pub server_id: u32,
    pub system_pid: u32,
    pub scene_id: String,
}

impl GameServerStatus {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            is_online: reader.read_i8("isOnline")?,
            ip_address: reader.read_ascii("ipAddress")?,
            server_id: reader.read_u32("serverId")?,
            system_pid: reader.read_u32("systemPid")?,
            scene_id: reader.read_ascii("sceneId")?,
        })
    }
}

/// Frame timing sample from one game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEnd {
    pub server_id: u32,
    pub frame_time: u32,
    pub profiler_data: String,
}

impl FrameEnd {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            server_id: reader.read_u32("serverId")?,
            frame_time: reader.read_u32("frameTime")?,
            profiler_data: reader.read_ascii("profilerData")?,
        })
    }
}

/// A decoded message body, one variant per recognised type code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanetMessage {
    PlanetNodeStatus(Vec<PlanetNodeStatusEntry>),
    PlanetObjectStatus(Vec<PlanetObjectStatusEntry>),
    GameServerStatus(GameServerStatus),
    FrameEnd(FrameEnd),
}

impl PlanetMessage {
    /// Discriminator of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            PlanetMessage::PlanetNodeStatus(_) => MessageKind::PlanetNodeStatus,
            PlanetMessage::PlanetObjectStatus(_) => MessageKind::PlanetObjectStatus,
            PlanetMessage::GameServerStatus(_) => MessageKind::GameServerStatus,
            PlanetMessage::FrameEnd(_) => MessageKind::FrameEnd,
        }
    }

    /// Reads the body of a message of the given kind.
    pub(crate) fn decode_body(kind: MessageKind, reader: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        match kind {
            MessageKind::PlanetNodeStatus => {
                let (count, capacity) = reader.read_count("nodeCount", PlanetNodeStatusEntry::MIN_ENCODED_SIZE)?;
                let mut entries = Vec::with_capacity(capacity);
                for _ in 0..count {
                    entries.push(PlanetNodeStatusEntry::decode(reader)?);
                }
                Ok(PlanetMessage::PlanetNodeStatus(entries))
            }
            MessageKind::PlanetObjectStatus => {
                let (count, capacity) = reader.read_count("objectCount", PlanetObjectStatusEntry::ENCODED_SIZE)?;
                let mut entries = Vec::with_capacity(capacity);
                for _ in 0..count {
                    entries.push(PlanetObjectStatusEntry::decode(reader)?);
                }
                Ok(PlanetMessage::PlanetObjectStatus(entries))
            }
            MessageKind::GameServerStatus => Ok(PlanetMessage::GameServerStatus(GameServerStatus::decode(reader)?)),
            MessageKind::FrameEnd => Ok(PlanetMessage::FrameEnd(FrameEnd::decode(reader)?)),
        }
    }
}

/// A message together with the header it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub header: MessageHeader,
    pub message: PlanetMessage,
}

impl DecodedMessage {
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }
}

fn serialize_network_id<S: Serializer>(network_id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(network_id)
}
