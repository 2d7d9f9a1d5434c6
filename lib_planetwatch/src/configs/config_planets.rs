//! # Planet Directory
//!
//! The watcher never decides where a planet lives; it asks a
//! [`PlanetDirectory`] for the `{host, port}` of a planet name when the first
//! subscriber for that planet arrives. The directory is normally loaded from a
//! JSON file of the form:
//!
//! ```json
//! {
//!   "tatooine": { "host": "10.0.0.21", "port": 60000 },
//!   "naboo":    { "host": "10.0.0.22", "port": 60000 }
//! }
//! ```

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a planet directory.
#[derive(Debug, Error)]
pub enum PlanetConfigError {
    #[error("Failed to read planet directory {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid planet directory JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Network location of one planet server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanetAddress {
    pub host: String,
    pub port: u16,
}

impl PlanetAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for PlanetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lookup of planet name → server address.
pub trait PlanetDirectory: Send + Sync {
    /// Returns the address for `planet`, or `None` if it is not configured.
    fn lookup(&self, planet: &str) -> Option<PlanetAddress>;
}

/// An in-memory directory, usually loaded from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticPlanetDirectory {
    planets: HashMap<String, PlanetAddress>,
}

impl StaticPlanetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a planet, returning the directory for chaining.
    pub fn with_planet(mut self, planet: impl Into<String>, address: PlanetAddress) -> Self {
        self.insert(planet, address);
        self
    }

    pub fn insert(&mut self, planet: impl Into<String>, address: PlanetAddress) -> Option<PlanetAddress> {
        self.planets.insert(planet.into(), address)
    }

    /// Parses a directory from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, PlanetConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a directory file.
    pub fn load(path: &Path) -> Result<Self, PlanetConfigError> {
        let json = fs::read_to_string(path).map_err(|source| PlanetConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let directory = Self::from_json_str(&json)?;
        log::info!("Loaded {} planet(s) from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// Configured planet names, sorted.
    pub fn planet_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.planets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }
}

impl PlanetDirectory for StaticPlanetDirectory {
    fn lookup(&self, planet: &str) -> Option<PlanetAddress> {
        self.planets.get(planet).cloned()
    }
}

impl FromIterator<(String, PlanetAddress)> for StaticPlanetDirectory {
    fn from_iter<I: IntoIterator<Item = (String, PlanetAddress)>>(iter: I) -> Self {
        Self {
            planets: iter.into_iter().collect(),
        }
    }
}
