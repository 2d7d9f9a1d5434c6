//! # Subscription Handle
//!
//! What `PlanetWatcher::subscribe` returns: a per-subscriber event queue with
//! an explicit, idempotent `close`. Closing (or dropping) the handle
//! detaches it from its planet connection and releases its pooled planet
//! reference exactly once.

#![forbid(unsafe_code)]

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;

use crate::core::dispatcher::EventReceiver;
use crate::core::events::{PlanetEvent, Topic};
use crate::core::registry::ConnectionPool;
use crate::ingestors::planet_tcp::PlanetConnection;

pub struct Subscription {
    id: u64,
    topic: Topic,
    client_id: Option<String>,
    receiver: EventReceiver,
    connection: Arc<PlanetConnection>,
    pool: Arc<ConnectionPool>,
    closed: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: u64,
        topic: Topic,
        client_id: Option<String>,
        receiver: EventReceiver,
        connection: Arc<PlanetConnection>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            id,
            topic,
            client_id,
            receiver,
            connection,
            pool,
            closed: false,
        }
    }

    /// Waits for the next event. `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<Arc<PlanetEvent>> {
        if self.closed {
            return None;
        }
        self.receiver.recv().await
    }

    /// Returns an already queued event without waiting.
    pub fn try_next(&mut self) -> Option<Arc<PlanetEvent>> {
        if self.closed {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    /// # Close
    ///
    /// Stops delivery and releases the planet. Only the first call has any
    /// effect; events still queued are discarded.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connection.detach(self.id);
        self.receiver.close();
        self.pool.release(self.connection.planet());
        log::info!("Subscriber {} closed {} on '{}'", self.id, self.topic, self.connection.planet());
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn planet(&self) -> &str {
        self.connection.planet()
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Stream for Subscription {
    type Item = Arc<PlanetEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
