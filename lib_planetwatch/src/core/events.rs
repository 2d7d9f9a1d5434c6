//! # Fan-out Events
//!
//! The unit of delivery between a planet connection and its subscribers.
//! Every decoded message becomes one [`PlanetEvent`] on one [`Topic`]; a
//! joining subscriber additionally receives one replay event built from the
//! connection's state cache.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::protocol::messages::{FrameEnd, GameServerStatus, PlanetNodeStatusEntry, PlanetObjectStatusEntry};

/// Subscription topics, one per message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    ObjectUpdate,
    NodeStatusUpdate,
    GameServerStatus,
    FrameEnd,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::ObjectUpdate,
        Topic::NodeStatusUpdate,
        Topic::GameServerStatus,
        Topic::FrameEnd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::ObjectUpdate => "OBJECT_UPDATE",
            Topic::NodeStatusUpdate => "NODE_STATUS_UPDATE",
            Topic::GameServerStatus => "GAME_SERVER_STATUS",
            Topic::FrameEnd => "FRAME_END",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown topic '{0}'")]
pub struct ParseTopicError(pub String);

impl FromStr for Topic {
    type Err = ParseTopicError;

    /// Accepts the canonical upper-case names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseTopicError(s.to_string()))
    }
}

/// Payload of an event. Serialized without a tag: the topic says what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventData {
    NodeStatus(Vec<PlanetNodeStatusEntry>),
    ObjectStatus(Vec<PlanetObjectStatusEntry>),
    GameServerStatus(Vec<GameServerStatus>),
    FrameEnd(FrameEnd),
}

impl EventData {
    /// Topic this payload is published on.
    pub fn topic(&self) -> Topic {
        match self {
            EventData::NodeStatus(_) => Topic::NodeStatusUpdate,
            EventData::ObjectStatus(_) => Topic::ObjectUpdate,
            EventData::GameServerStatus(_) => Topic::GameServerStatus,
            EventData::FrameEnd(_) => Topic::FrameEnd,
        }
    }

    /// Number of entries carried.
    pub fn len(&self) -> usize {
        match self {
            EventData::NodeStatus(entries) => entries.len(),
            EventData::ObjectStatus(entries) => entries.len(),
            EventData::GameServerStatus(entries) => entries.len(),
            EventData::FrameEnd(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// # Planet Event
///
/// What a subscriber receives. `client_id` is set on replay events and scopes
/// the event to the subscriber registered with the same id; broadcast events
/// leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetEvent {
    pub planet: String,
    pub topic: Topic,
    pub data: EventData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl PlanetEvent {
    /// An event for every subscriber of the planet and the payload's topic.
    pub fn broadcast(planet: impl Into<String>, data: EventData) -> Self {
        Self {
            planet: planet.into(),
            topic: data.topic(),
            data,
            client_id: None,
        }
    }

    /// An event for the subscriber registered with `client_id` only.
    pub fn scoped(planet: impl Into<String>, data: EventData, client_id: Option<String>) -> Self {
        Self {
            client_id,
            ..Self::broadcast(planet, data)
        }
    }
}
