//! # Planet Watcher
//!
//! Entry point of the library. A [`PlanetWatcher`] ties together the planet
//! directory and the connection pool, and hands out
//! [`Subscription`]s.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use lib_planetwatch::{PlanetWatcher, StaticPlanetDirectory, Topic};
//!
//! let directory = StaticPlanetDirectory::load("planets.json".as_ref())?;
//! let watcher = PlanetWatcher::new(Arc::new(directory));
//!
//! let mut objects = watcher.subscribe(Topic::ObjectUpdate, "tatooine", None)?;
//! while let Some(event) = objects.next().await {
//!     println!("{}", serde_json::to_string(&*event)?);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use std::sync::Arc;

use thiserror::Error;

use crate::configs::config_planets::PlanetDirectory;
use crate::core::events::Topic;
use crate::core::registry::ConnectionPool;
use crate::core::subscription::Subscription;
use crate::ingestors::planet_tcp::ConnectionStatus;
use crate::protocol::framer::FramerConfig;

/// Errors surfaced to callers of `subscribe`.
///
/// Socket failures are deliberately absent: they are logged and show up as a
/// `Closed` connection status, never as a failed subscribe.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatcherError {
    #[error("No address configured for planet '{0}'")]
    UnknownPlanet(String),

    #[error("Planet connections must be opened from within a Tokio runtime")]
    NoRuntime,
}

#[derive(Clone)]
pub struct PlanetWatcher {
    pool: Arc<ConnectionPool>,
}

impl PlanetWatcher {
    pub fn new(directory: Arc<dyn PlanetDirectory>) -> Self {
        Self::with_framer_config(directory, FramerConfig::default())
    }

    pub fn with_framer_config(directory: Arc<dyn PlanetDirectory>, framer_config: FramerConfig) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new(directory, framer_config)),
        }
    }

    /// # Subscribe
    ///
    /// Attaches to `planet`, opening its connection if no one else holds it,
    /// and returns a stream of `topic` events. The first event is a replay of
    /// the planet's cached state for that topic (except for `FRAME_END`,
    /// which has none), tagged with `client_id`.
    pub fn subscribe(&self, topic: Topic, planet: &str, client_id: Option<String>) -> Result<Subscription, WatcherError> {
        let connection = self.pool.acquire(planet)?;
        let (id, receiver) = connection.attach(topic, client_id.clone());
        log::info!(
            "Subscribed to {} on '{}' (subscriber {}, client {})",
            topic,
            planet,
            id,
            client_id.as_deref().unwrap_or("-")
        );
        Ok(Subscription::new(id, topic, client_id, receiver, connection, Arc::clone(&self.pool)))
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Subscribers attached to `topic` on `planet`; zero when it is not pooled.
    pub fn subscriber_count(&self, planet: &str, topic: Topic) -> usize {
        self.pool
            .connection(planet)
            .map_or(0, |connection| connection.subscriber_count(topic))
    }

    /// Status of the pooled connection for `planet`, if it is pooled.
    pub fn connection_status(&self, planet: &str) -> Option<ConnectionStatus> {
        self.pool.connection(planet).map(|connection| connection.status())
    }
}
