//! # Frame Encoder
//!
//! Writes messages in the planet server wire format. The watcher itself only
//! ever reads this protocol; the encoder exists for fake planets in tests and
//! for replay tooling that needs to produce byte-exact captures.

#![forbid(unsafe_code)]

use bytes::{BufMut, BytesMut};

use crate::protocol::messages::{
    FrameEnd, GameServerStatus, MessageHeader, PlanetMessage, PlanetNodeStatusEntry, PlanetObjectStatusEntry,
};

/// Encodes a message payload using the kind's standard operand count.
pub fn encode_payload(message: &PlanetMessage) -> BytesMut {
    let kind = message.kind();
    encode_payload_with_header(
        MessageHeader {
            operand_count: kind.operand_count(),
            type_code: kind.type_code(),
        },
        message,
    )
}

/// Encodes a payload with an explicit header.
pub fn encode_payload_with_header(header: MessageHeader, message: &PlanetMessage) -> BytesMut {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u16_le(header.operand_count);
    buf.put_i32_le(header.type_code);
    match message {
        PlanetMessage::PlanetNodeStatus(entries) => {
            buf.put_u32_le(entries.len() as u32);
            entries.iter().for_each(|entry| put_node(&mut buf, entry));
        }
        PlanetMessage::PlanetObjectStatus(entries) => {
            buf.put_u32_le(entries.len() as u32);
            entries.iter().for_each(|entry| put_object(&mut buf, entry));
        }
        PlanetMessage::GameServerStatus(status) => put_game_server(&mut buf, status),
        PlanetMessage::FrameEnd(frame_end) => put_frame_end(&mut buf, frame_end),
    }
    buf
}

/// Prefixes a payload with its `u32` little-endian length.
pub fn frame(payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf
}

/// Encodes a complete frame for `message`.
pub fn encode_frame(message: &PlanetMessage) -> BytesMut {
    frame(&encode_payload(message))
}

fn put_ascii(buf: &mut BytesMut, text: &str) {
    let bytes = &text.as_bytes()[..text.len().min(u16::MAX as usize)];
    buf.put_u16_le(bytes.len() as u16);
    buf.put_slice(bytes);
}

fn put_u32_list(buf: &mut BytesMut, values: &[u32]) {
    buf.put_u32_le(values.len() as u32);
    values.iter().for_each(|value| buf.put_u32_le(*value));
}

fn put_node(buf: &mut BytesMut, entry: &PlanetNodeStatusEntry) {
    buf.put_i32_le(entry.location_x);
    buf.put_i32_le(entry.location_z);
    buf.put_i8(entry.is_loaded);
    put_u32_list(buf, &entry.servers);
    put_u32_list(buf, &entry.subscriptions);
}

fn put_object(buf: &mut BytesMut, entry: &PlanetObjectStatusEntry) {
    buf.put_i64_le(entry.network_id);
    buf.put_i32_le(entry.location_x);
    buf.put_i32_le(entry.location_z);
    buf.put_u32_le(entry.authoritative_server);
    buf.put_i32_le(entry.interest_radius);
    buf.put_i32_le(entry.delete_object);
    buf.put_i32_le(entry.object_type_tag);
    buf.put_i32_le(entry.level);
    buf.put_i8(entry.hibernating);
    buf.put_i32_le(entry.template_crc);
    buf.put_i32_le(entry.ai_activity);
    buf.put_i32_le(entry.creation_type);
}

fn put_game_server(buf: &mut BytesMut, status: &GameServerStatus) {
    buf.put_i8(status.is_online);
    put_ascii(buf, &status.ip_address);
    buf.put_u32_le(status.server_id);
    buf.put_u32_le(status.system_pid);
    put_ascii(buf, &status.scene_id);
}

fn put_frame_end(buf: &mut BytesMut, frame_end: &FrameEnd) {
    buf.put_u32_le(frame_end.server_id);
    buf.put_u32_le(frame_end.frame_time);
    put_ascii(buf, &frame_end.profiler_data);
}
