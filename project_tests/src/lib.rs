//! # Planet Watcher Test Harness
//!
//! Shared helpers for the end-to-end tests in `tests/`: a fake planet server
//! on a loopback `TcpListener`, message builders, and timeout-guarded waits on
//! subscriptions and connection status.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use lib_planetwatch::protocol::encoder::encode_frame;
use lib_planetwatch::protocol::{GameServerStatus, PlanetMessage, PlanetNodeStatusEntry, PlanetObjectStatusEntry};
use lib_planetwatch::{
    ConnectionStatus, PlanetAddress, PlanetEvent, PlanetWatcher, StaticPlanetDirectory, Subscription,
};

/// Upper bound on any single wait in the tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// A planet server stand-in listening on an ephemeral loopback port.
pub struct FakePlanet {
    listener: TcpListener,
    address: PlanetAddress,
}

impl FakePlanet {
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            address: PlanetAddress::new("127.0.0.1", port),
        })
    }

    pub fn address(&self) -> PlanetAddress {
        self.address.clone()
    }

    /// Waits for the watcher to open its socket.
    pub async fn accept(&self) -> Result<PlanetPeer> {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .context("no connection from the watcher")??;
        Ok(PlanetPeer { stream })
    }

    /// Fails if the watcher opens another socket within `window`.
    pub async fn expect_no_connection(&self, window: Duration) -> Result<()> {
        match timeout(window, self.listener.accept()).await {
            Err(_) => Ok(()),
            Ok(Ok((_, peer))) => bail!("unexpected extra connection from {peer}"),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

/// The server side of one accepted watcher connection.
pub struct PlanetPeer {
    stream: TcpStream,
}

impl PlanetPeer {
    pub async fn send(&mut self, message: &PlanetMessage) -> Result<()> {
        self.send_raw(&encode_frame(message)).await
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Sends `bytes` one byte per write.
    pub async fn send_trickle(&mut self, bytes: &[u8]) -> Result<()> {
        for byte in bytes {
            self.send_raw(std::slice::from_ref(byte)).await?;
        }
        Ok(())
    }

    /// Waits until the watcher closes its end.
    pub async fn expect_eof(&mut self) -> Result<()> {
        let mut buf = [0u8; 256];
        timeout(WAIT, async {
            loop {
                match self.stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(_) => continue,
                }
            }
        })
        .await
        .context("watcher kept the socket open")
    }
}

/// Directory pointing each named planet at its fake server.
pub fn directory(planets: &[(&str, &FakePlanet)]) -> StaticPlanetDirectory {
    planets
        .iter()
        .map(|(name, planet)| (name.to_string(), planet.address()))
        .collect()
}

pub fn watcher(planets: &[(&str, &FakePlanet)]) -> PlanetWatcher {
    PlanetWatcher::new(Arc::new(directory(planets)))
}

/// Next event on `subscription`, failing after [`WAIT`].
pub async fn recv(subscription: &mut Subscription) -> Result<Arc<PlanetEvent>> {
    timeout(WAIT, subscription.next())
        .await
        .context("timed out waiting for an event")?
        .context("subscription ended")
}

/// Fails if an event arrives within `window`.
pub async fn expect_silence(subscription: &mut Subscription, window: Duration) -> Result<()> {
    match timeout(window, subscription.next()).await {
        Err(_) => Ok(()),
        Ok(event) => bail!("unexpected event {event:?}"),
    }
}

/// Polls until the pooled connection for `planet` reports `wanted`.
pub async fn wait_for_status(watcher: &PlanetWatcher, planet: &str, wanted: ConnectionStatus) -> Result<()> {
    let connection = watcher
        .pool()
        .connection(planet)
        .with_context(|| format!("planet '{planet}' is not pooled"))?;
    let mut status = connection.watch_status();
    timeout(WAIT, status.wait_for(|s| *s == wanted))
        .await
        .with_context(|| format!("'{planet}' never reached {wanted:?}"))??;
    Ok(())
}

pub fn node(location_x: i32, location_z: i32, is_loaded: i8) -> PlanetNodeStatusEntry {
    PlanetNodeStatusEntry {
        location_x,
        location_z,
        is_loaded,
        servers: vec![1, 2],
        subscriptions: vec![3],
    }
}

pub fn object(network_id: i64, delete_object: i32) -> PlanetObjectStatusEntry {
    PlanetObjectStatusEntry {
        network_id,
        location_x: 100,
        location_z: -100,
        authoritative_server: 1,
        interest_radius: 64,
        delete_object,
        object_type_tag: 0x4352_4541,
        level: 10,
        hibernating: 0,
        template_crc: 0x1234_5678,
        ai_activity: 2,
        creation_type: 1,
    }
}

pub fn game_server(server_id: u32, is_online: i8) -> GameServerStatus {
    GameServerStatus {
        is_online,
        ip_address: format!("10.0.0.{server_id}"),
        server_id,
        system_pid: 1000 + server_id,
        scene_id: "tatooine".to_string(),
    }
}
