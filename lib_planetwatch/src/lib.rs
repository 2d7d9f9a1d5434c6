//! # lib_planetwatch
//!
//! Real-time telemetry ingestion and fan-out for planet servers. Keeps one TCP
//! connection per planet, decodes its binary status stream, caches the latest
//! state and republishes every update to any number of subscribers. A new
//! subscriber first receives a replay of the cached state.

pub mod configs;
pub mod core;
pub mod ingestors;
pub mod protocol;
pub mod utils;

// Re-export the public surface
pub use crate::configs::{PlanetAddress, PlanetConfigError, PlanetDirectory, StaticPlanetDirectory};
pub use crate::core::{EventData, PlanetEvent, PlanetWatcher, Subscription, Topic, WatcherError};
pub use crate::ingestors::ConnectionStatus;
pub use crate::protocol::{DecodeError, FramerConfig};
pub use crate::utils::get_planet_cell_index;
