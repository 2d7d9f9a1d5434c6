//! # Planet State Cache
//!
//! Latest-value cache for one planet connection. Every decoded message is
//! folded into the cache before it is fanned out, so a subscriber that joins
//! late can be handed the current picture of the planet in a single replay
//! event.
//!
//! | Kind                 | Key                        | Replay topic          |
//! |----------------------|----------------------------|-----------------------|
//! | PlanetNodeStatus     | cell index of the node     | `NODE_STATUS_UPDATE`  |
//! | PlanetObjectStatus   | network id                 | `OBJECT_UPDATE`       |
//! | GameServerStatus     | server id                  | `GAME_SERVER_STATUS`  |
//! | FrameEnd             | not cached                 | none                  |
//!
//! Ordered maps keep replay payloads deterministic.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use crate::core::events::{EventData, Topic};
use crate::protocol::messages::{GameServerStatus, PlanetMessage, PlanetNodeStatusEntry, PlanetObjectStatusEntry};

#[derive(Debug, Default, Clone)]
pub struct StateCache {
    nodes: BTreeMap<i64, PlanetNodeStatusEntry>,
    objects: BTreeMap<i64, PlanetObjectStatusEntry>,
    game_servers: BTreeMap<u32, GameServerStatus>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a message into the cache and returns the topic and payload it
    /// should be published with.
    ///
    /// Objects whose `delete_object` is positive are removed rather than
    /// stored; the deleting update itself is still published.
    pub fn apply(&mut self, message: PlanetMessage) -> (Topic, EventData) {
        let data = match message {
            PlanetMessage::PlanetNodeStatus(entries) => {
                for entry in &entries {
                    self.nodes.insert(entry.cell_index(), entry.clone());
                }
                EventData::NodeStatus(entries)
            }
            PlanetMessage::PlanetObjectStatus(entries) => {
                for entry in &entries {
                    if entry.is_deleted() {
                        self.objects.remove(&entry.network_id);
                    } else {
                        self.objects.insert(entry.network_id, entry.clone());
                    }
                }
                EventData::ObjectStatus(entries)
            }
            PlanetMessage::GameServerStatus(status) => {
                self.game_servers.insert(status.server_id, status.clone());
                EventData::GameServerStatus(vec![status])
            }
            PlanetMessage::FrameEnd(frame) => EventData::FrameEnd(frame),
        };
        (data.topic(), data)
    }

    /// Everything currently cached for `topic`, as a single payload.
    ///
    /// `FRAME_END` has no cached state and yields `None`; the other topics
    /// always yield a payload, possibly empty.
    pub fn snapshot(&self, topic: Topic) -> Option<EventData> {
        match topic {
            Topic::NodeStatusUpdate => Some(EventData::NodeStatus(self.nodes.values().cloned().collect())),
            Topic::ObjectUpdate => Some(EventData::ObjectStatus(self.objects.values().cloned().collect())),
            Topic::GameServerStatus => Some(EventData::GameServerStatus(self.game_servers.values().cloned().collect())),
            Topic::FrameEnd => None,
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.objects.clear();
        self.game_servers.clear();
    }

    pub fn node(&self, cell_index: i64) -> Option<&PlanetNodeStatusEntry> {
        self.nodes.get(&cell_index)
    }

    pub fn object(&self, network_id: i64) -> Option<&PlanetObjectStatusEntry> {
        self.objects.get(&network_id)
    }

    pub fn game_server(&self, server_id: u32) -> Option<&GameServerStatus> {
        self.game_servers.get(&server_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn game_server_count(&self) -> usize {
        self.game_servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.objects.is_empty() && self.game_servers.is_empty()
    }
}
