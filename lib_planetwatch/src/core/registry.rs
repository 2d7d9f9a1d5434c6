//! # Connection Pool
//!
//! Reference-counted registry of planet connections. Any number of
//! subscribers share one socket per planet: the first `acquire` for a planet
//! opens it, each further `acquire` bumps the count, and the `release` that
//! brings the count to zero disconnects it and forgets the planet.
//!
//! The refcount and the entry live under one lock, so overlapping
//! acquire/release calls for the same planet can neither lose an update nor
//! disconnect twice.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::configs::config_planets::PlanetDirectory;
use crate::core::watcher::WatcherError;
use crate::ingestors::planet_tcp::PlanetConnection;
use crate::protocol::framer::FramerConfig;

struct PoolEntry {
    refcount: u32,
    connection: Arc<PlanetConnection>,
}

pub struct ConnectionPool {
    entries: Mutex<HashMap<String, PoolEntry>>,
    directory: Arc<dyn PlanetDirectory>,
    framer_config: FramerConfig,
}

impl ConnectionPool {
    pub fn new(directory: Arc<dyn PlanetDirectory>, framer_config: FramerConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            directory,
            framer_config,
        }
    }

    /// Returns the shared connection for `planet`, opening it if this is the
    /// first reference.
    ///
    /// Fails only when the planet has no configured address or there is no
    /// runtime to run the socket on. A planet that cannot be reached still
    /// yields a connection; it just ends up `Closed`.
    pub fn acquire(&self, planet: &str) -> Result<Arc<PlanetConnection>, WatcherError> {
        let mut entries = self.entries.lock().expect("Pool lock poisoned");

        if let Some(entry) = entries.get_mut(planet) {
            entry.refcount += 1;
            log::debug!("Planet '{}' acquired (refcount {})", planet, entry.refcount);
            return Ok(Arc::clone(&entry.connection));
        }

        let address = self
            .directory
            .lookup(planet)
            .ok_or_else(|| WatcherError::UnknownPlanet(planet.to_string()))?;
        let connection = Arc::new(PlanetConnection::new(planet, address, self.framer_config));
        connection.connect()?;

        entries.insert(
            planet.to_string(),
            PoolEntry {
                refcount: 1,
                connection: Arc::clone(&connection),
            },
        );
        log::info!("Planet '{}' opened (refcount 1)", planet);
        Ok(connection)
    }

    /// Drops one reference to `planet`. The last release disconnects.
    ///
    /// Releasing a planet that is not pooled is a logged no-op and returns
    /// `false`.
    pub fn release(&self, planet: &str) -> bool {
        let closing = {
            let mut entries = self.entries.lock().expect("Pool lock poisoned");
            let Some(entry) = entries.get_mut(planet) else {
                log::warn!("Release of planet '{}' which holds no references", planet);
                return false;
            };

            entry.refcount -= 1;
            if entry.refcount > 0 {
                log::debug!("Planet '{}' released (refcount {})", planet, entry.refcount);
                return true;
            }
            entries.remove(planet).map(|entry| entry.connection)
        };

        if let Some(connection) = closing {
            log::info!("Last reference to planet '{}' released", planet);
            connection.disconnect();
        }
        true
    }

    /// Current reference count, `None` when the planet is not pooled.
    pub fn refcount(&self, planet: &str) -> Option<u32> {
        let entries = self.entries.lock().expect("Pool lock poisoned");
        entries.get(planet).map(|entry| entry.refcount)
    }

    /// The pooled connection for `planet`, without taking a reference.
    pub fn connection(&self, planet: &str) -> Option<Arc<PlanetConnection>> {
        let entries = self.entries.lock().expect("Pool lock poisoned");
        entries.get(planet).map(|entry| Arc::clone(&entry.connection))
    }

    /// Names of all pooled planets, sorted.
    pub fn active_planets(&self) -> Vec<String> {
        let entries = self.entries.lock().expect("Pool lock poisoned");
        let mut planets: Vec<String> = entries.keys().cloned().collect();
        planets.sort_unstable();
        planets
    }
}
