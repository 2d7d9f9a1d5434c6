//! # Planet Event Dispatcher
//!
//! Fans decoded planet events out to subscribers. Every planet connection
//! owns its own dispatcher, so publishing on one planet never contends with
//! another. Subscribers register for a topic and receive events through their
//! own unbounded MPSC queue.
//!
//! ## Core Design Principles:
//!
//! 1.  **Zero-Copy Fan-out**: an event is wrapped in an `Arc` once and every
//!     matching subscriber receives a clone of the pointer.
//!
//! 2.  **Scoped Delivery**: an event carrying a `client_id` is delivered only
//!     to subscribers registered with that same id. Replay events use this so
//!     a joining subscriber's snapshot is never seen by its neighbours.
//!
//! 3.  **Lazy Cleanup**: subscribers whose receiver has been dropped are
//!     removed with `retain` on the next publish that reaches them.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::core::events::{PlanetEvent, Topic};

/// Receiving half handed to a subscriber.
pub type EventReceiver = mpsc::UnboundedReceiver<Arc<PlanetEvent>>;

/// # Subscriber Handle
///
/// Internal record of one registered subscriber.
struct SubscriberHandle {
    id: u64,
    topic: Topic,
    client_id: Option<String>,
    sender: mpsc::UnboundedSender<Arc<PlanetEvent>>,
}

impl SubscriberHandle {
    fn wants(&self, event: &PlanetEvent) -> bool {
        if self.topic != event.topic {
            return false;
        }
        match &event.client_id {
            None => true,
            Some(target) => self.client_id.as_deref() == Some(target.as_str()),
        }
    }
}

/// # Core Dispatcher
pub struct Dispatcher {
    planet: String,
    subscribers: Mutex<Vec<SubscriberHandle>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(planet: impl Into<String>) -> Self {
        Self {
            planet: planet.into(),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn planet(&self) -> &str {
        &self.planet
    }

    /// # Add Subscriber
    ///
    /// Registers a subscriber for `topic` and returns its id together with the
    /// receiving half of its queue.
    ///
    /// `replay` is placed in the new queue before the subscriber becomes
    /// visible to [`publish`](Self::publish), so it is always the first event
    /// the subscriber sees.
    pub fn add_subscriber(
        &self,
        topic: Topic,
        client_id: Option<String>,
        replay: Option<PlanetEvent>,
    ) -> (u64, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if let Some(event) = replay {
            // The receiver is still in hand; this cannot fail.
            let _ = tx.send(Arc::new(event));
        }

        let mut subscribers = self.subscribers.lock().expect("Dispatcher lock poisoned");
        subscribers.push(SubscriberHandle {
            id,
            topic,
            client_id,
            sender: tx,
        });
        log::debug!("Subscriber {} registered for {} on '{}'", id, topic, self.planet);
        (id, rx)
    }

    /// # Publish
    ///
    /// Delivers `event` to every matching subscriber and returns how many
    /// received it. Subscribers whose receiver is gone are dropped.
    pub fn publish(&self, event: PlanetEvent) -> usize {
        let event = Arc::new(event);
        let mut delivered = 0;

        let mut subscribers = self.subscribers.lock().expect("Dispatcher lock poisoned");
        subscribers.retain(|subscriber| {
            if !subscriber.wants(&event) {
                return true;
            }
            match subscriber.sender.send(Arc::clone(&event)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    log::info!("Subscriber {} on '{}' went away. Removing from dispatcher.", subscriber.id, self.planet);
                    false
                }
            }
        });
        delivered
    }

    /// Removes a subscriber by id. Returns whether it was registered.
    pub fn remove_subscriber(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers.lock().expect("Dispatcher lock poisoned");
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        if removed {
            log::debug!("Subscriber {} removed from '{}'.", id, self.planet);
        }
        removed
    }

    /// Subscribers currently registered for `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        let subscribers = self.subscribers.lock().expect("Dispatcher lock poisoned");
        subscribers.iter().filter(|s| s.topic == topic).count()
    }

    /// Subscribers across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.subscribers.lock().expect("Dispatcher lock poisoned").len()
    }

    /// Runs `f` while holding the subscriber lock.
    #[cfg(test)]
    pub(crate) fn hold<R>(&self, f: impl FnOnce() -> R) -> R {
        let _subscribers = self.subscribers.lock().expect("Dispatcher lock poisoned");
        f()
    }
}
