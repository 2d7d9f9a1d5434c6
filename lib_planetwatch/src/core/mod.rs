//! # Core Engine Module
//!
//! Shared-connection publish/subscribe machinery: everything between a decoded
//! planet message and the subscriber queues that receive it.
//!
//! ## Core Components:
//!
//! - **`events`**: topics and the `PlanetEvent` delivered to subscribers.
//!
//! - **`state_cache`**: latest node, object and game-server state per planet,
//!   the source of replay events.
//!
//! - **`dispatcher`**: the zero-copy fan-out owned by each planet
//!   connection. Routes each event to the subscribers of its topic, honouring
//!   `clientId` scoping.
//!
//! - **`registry`**: the reference-counted connection pool. One socket per
//!   planet, opened on first acquire and closed on last release.
//!
//! - **`subscription`**: the per-subscriber handle with idempotent close.
//!
//! - **`watcher`**: `PlanetWatcher`, the entry point that wires the above
//!   together.

#![forbid(unsafe_code)]

/// The central, zero-copy broadcaster for planet events.
pub mod dispatcher;
/// Topics and event payloads.
pub mod events;
/// Reference-counted planet connection pool.
pub mod registry;
/// Latest-value cache backing replay.
pub mod state_cache;
/// Subscriber handle.
pub mod subscription;
/// Library entry point and its error type.
pub mod watcher;

// --- Public API Re-exports ---
pub use dispatcher::{Dispatcher, EventReceiver};
pub use events::{EventData, ParseTopicError, PlanetEvent, Topic};
pub use registry::ConnectionPool;
pub use state_cache::StateCache;
pub use subscription::Subscription;
pub use watcher::{PlanetWatcher, WatcherError};
