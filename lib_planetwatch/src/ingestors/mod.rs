//! # Data Ingestors Module
//!
//! Clients for the upstream sources that feed subscribers. Each submodule
//! owns the connection lifecycle for one kind of source.
//!
//! ## Contained Modules:
//! - **`planet_tcp`**: one TCP socket per planet server, reading the
//!   length-prefixed telemetry stream into its state cache and fanout.

#![forbid(unsafe_code)]

/// TCP client for a planet server's telemetry stream.
pub mod planet_tcp;

// --- Public API Re-exports ---
pub use planet_tcp::{ConnectionStatus, PlanetConnection};
