//! # Planet TCP Ingestor
//!
//! One [`PlanetConnection`] owns one TCP socket to one planet server. Bytes
//! read from the socket are reassembled into frames, decoded, folded into the
//! connection's [`StateCache`] and published through the connection's own
//! [`Dispatcher`]. Planets share no fanout state.
//!
//! ## Lifecycle
//!
//! `Idle → Connecting → Connected → Closed`. There is no automatic reconnect:
//! once the socket fails or the remote closes it, the connection stays
//! `Closed` until its last subscriber releases it. The cache is left as it
//! was so late subscribers still get the last known picture.
//!
//! ## Ordering
//!
//! Applying a message and publishing its event happen under the cache lock,
//! and so does taking a replay snapshot and registering the subscriber. A
//! joining subscriber therefore sees a snapshot that is either entirely before
//! or entirely after any given message, and never misses or duplicates the
//! event for it.

#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::configs::config_planets::PlanetAddress;
use crate::core::dispatcher::{Dispatcher, EventReceiver};
use crate::core::events::{PlanetEvent, Topic};
use crate::core::state_cache::StateCache;
use crate::core::watcher::WatcherError;
use crate::protocol::framer::{FramerConfig, StreamFramer};
use crate::protocol::messages::PlanetMessage;

/// Size of a single socket read.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Where a planet connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Created, `connect()` not yet called.
    Idle,
    /// Socket connect in progress.
    Connecting,
    /// Socket open and being read.
    Connected,
    /// Socket closed, by `disconnect()` or by failure. Terminal.
    Closed,
}

pub struct PlanetConnection {
    planet: String,
    address: PlanetAddress,
    cache: Mutex<StateCache>,
    dispatcher: Dispatcher,
    framer_config: FramerConfig,
    status: watch::Sender<ConnectionStatus>,
    shutdown: CancellationToken,
}

impl PlanetConnection {
    pub fn new(planet: impl Into<String>, address: PlanetAddress, framer_config: FramerConfig) -> Self {
        let planet = planet.into();
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        Self {
            dispatcher: Dispatcher::new(planet.as_str()),
            planet,
            address,
            cache: Mutex::new(StateCache::new()),
            framer_config,
            status,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn planet(&self) -> &str {
        &self.planet
    }

    pub fn address(&self) -> &PlanetAddress {
        &self.address
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// A receiver that observes every status transition.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// # Connect
    ///
    /// Spawns the socket task on the current Tokio runtime. Only the first
    /// call on an `Idle` connection does anything. Socket failures are not
    /// returned: they are logged and surface as [`ConnectionStatus::Closed`].
    pub fn connect(self: &Arc<Self>) -> Result<(), WatcherError> {
        let runtime = Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        let started = self.status.send_if_modified(|status| {
            if *status == ConnectionStatus::Idle {
                *status = ConnectionStatus::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return Ok(());
        }

        let connection = Arc::clone(self);
        runtime.spawn(async move {
            tokio::select! {
                _ = connection.shutdown.cancelled() => {
                    log::debug!("Socket task for '{}' cancelled", connection.planet);
                }
                result = connection.stream() => match result {
                    Ok(()) => log::warn!("Planet '{}' ({}) closed the connection", connection.planet, connection.address),
                    Err(e) => log::error!("Planet '{}' ({}) socket error: {}", connection.planet, connection.address, e),
                },
            }
            connection.status.send_replace(ConnectionStatus::Closed);
        });
        Ok(())
    }

    /// Reads the socket until EOF or error.
    async fn stream(&self) -> std::io::Result<()> {
        log::info!("Connecting to planet '{}' at {}", self.planet, self.address);
        let mut socket = TcpStream::connect((self.address.host.as_str(), self.address.port)).await?;
        self.status.send_if_modified(|status| {
            if *status == ConnectionStatus::Connecting {
                *status = ConnectionStatus::Connected;
                true
            } else {
                false
            }
        });
        log::info!("Connected to planet '{}'", self.planet);

        let mut framer = StreamFramer::new(self.framer_config);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            if let Err(e) = framer.push(&chunk[..n], |decoded| self.apply(decoded.message)) {
                log::warn!("Dropped buffered stream data from '{}': {}", self.planet, e);
            }
        }
    }

    /// Folds one message into the cache and publishes it.
    fn apply(&self, message: PlanetMessage) {
        let mut cache = self.lock_cache();
        if self.shutdown.is_cancelled() {
            return;
        }
        let (topic, data) = cache.apply(message);
        let delivered = self.dispatcher.publish(PlanetEvent::broadcast(self.planet.as_str(), data));
        log::trace!("'{}' {} delivered to {} subscriber(s)", self.planet, topic, delivered);
    }

    /// # Attach
    ///
    /// Registers a subscriber for `topic` on this planet. Its queue is seeded
    /// with a replay of the cached state for the topic, scoped to `client_id`.
    pub fn attach(&self, topic: Topic, client_id: Option<String>) -> (u64, EventReceiver) {
        let cache = self.lock_cache();
        let replay = cache
            .snapshot(topic)
            .map(|data| PlanetEvent::scoped(self.planet.as_str(), data, client_id.clone()));
        self.dispatcher.add_subscriber(topic, client_id, replay)
    }

    /// Unregisters a subscriber. Returns whether it was attached.
    pub fn detach(&self, id: u64) -> bool {
        self.dispatcher.remove_subscriber(id)
    }

    /// Subscribers currently attached for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.dispatcher.subscriber_count(topic)
    }

    /// # Disconnect
    ///
    /// Stops the socket task, discards cached state and marks the connection
    /// `Closed`. Idempotent.
    pub fn disconnect(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        {
            let mut cache = self.lock_cache();
            self.shutdown.cancel();
            cache.clear();
        }
        self.status.send_replace(ConnectionStatus::Closed);
        log::info!("Disconnected from planet '{}'", self.planet);
    }

    /// Read access to the cache, for inspection.
    pub fn with_cache<R>(&self, f: impl FnOnce(&StateCache) -> R) -> R {
        f(&self.lock_cache())
    }

    fn lock_cache(&self) -> MutexGuard<'_, StateCache> {
        self.cache.lock().expect("State cache lock poisoned")
    }
}
