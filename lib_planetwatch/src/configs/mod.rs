//! # Configuration Modules
//!
//! Configuration consumed by the watcher library. Server-level settings
//! (ports, log locations) belong to the binaries; the library only needs to
//! know where each planet server can be reached.

/// Planet name → `{host, port}` directory and its JSON loader.
pub mod config_planets;

pub use config_planets::{PlanetAddress, PlanetConfigError, PlanetDirectory, StaticPlanetDirectory};
