//! Broker engine
//!
//! This module contains the long-poll delivery broker responsible for:
//! - registering a client every time it issues `listen`
//! - parking the poll until a message is ready, or answering it straight
//!   from the client's backlog
//! - direct, multi-target and broadcast sends
//! - per-client keepalive refresh timers
//! - a broker-wide enable/disable switch
//!
//! Concurrency and usage notes:
//! - `Broker` is a cheap clonable handle. All per-client state lives in one
//!   registry behind one lock, so a send, a timer firing, a registration and
//!   a disconnect for the same client can never interleave.
//! - `listen` is the only operation that waits, and it never waits while
//!   holding the lock. Every other call returns immediately.
//! - At most one poll per client is live. A newer `listen` releases the older
//!   one with a `Timeout` message instead of leaving it hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::broker::message::{ClientId, Message, Properties, Registration};
use crate::broker::refresh::{DEFAULT_KEEPALIVE, RefreshTimer};
use crate::broker::registry::{Delivery, Registry};
use crate::config::BrokerSettings;

const DEFAULT_REGISTRATION_BUFFER: usize = 64;

/// Shortest keepalive accepted from configuration.
pub const MIN_KEEPALIVE: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Shared {
    registry: Mutex<Registry>,
    disabled: AtomicBool,
    keepalive: Duration,
    registrations: broadcast::Sender<Registration>,
}

impl Shared {
    fn fire_refresh(&self, client_id: ClientId, generation: u64) {
        let mut registry = self.registry.lock();
        if !registry.take_refresh(client_id, generation) {
            trace!(client_id, generation, "stale refresh timer ignored");
            return;
        }
        let delivery = registry.entry_or_create(client_id).deliver(Message::refresh());
        debug!(client_id, ?delivery, "refresh timer fired");
    }
}

#[derive(Debug, Clone)]
pub struct Broker {
    shared: Arc<Shared>,
}

impl Default for Broker {
    fn default() -> Self {
        Self::with_options(DEFAULT_KEEPALIVE, DEFAULT_REGISTRATION_BUFFER)
    }
}

impl Broker {
    /// Builds a broker from configuration. A keepalive below
    /// [`MIN_KEEPALIVE`] is raised to it.
    pub fn new(settings: &BrokerSettings) -> Self {
        Self::with_options(
            Duration::from_secs(settings.keepalive_secs).max(MIN_KEEPALIVE),
            settings.registration_buffer,
        )
    }

    /// Creates a broker whose refresh timers fire after `keepalive`.
    pub fn with_keepalive(keepalive: Duration) -> Self {
        Self::with_options(keepalive, DEFAULT_REGISTRATION_BUFFER)
    }

    fn with_options(keepalive: Duration, registration_buffer: usize) -> Self {
        let (registrations, _) = broadcast::channel(registration_buffer.max(1));
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::new()),
                disabled: AtomicBool::new(false),
                keepalive,
                registrations,
            }),
        }
    }

    pub fn keepalive(&self) -> Duration {
        self.shared.keepalive
    }

    /// Long-polls for the next message addressed to `client_id`.
    ///
    /// While the broker is disabled this answers `Disabled` at once and
    /// touches no client state. Otherwise the client is (re)registered with
    /// `properties`, a fresh refresh timer is armed, and the oldest backlog
    /// message is returned if there is one. With an empty backlog the call
    /// waits until a send, a broadcast or the refresh timer resolves it.
    ///
    /// Never fails: every outcome is a well-formed [`Message`].
    pub async fn listen(&self, client_id: ClientId, properties: Properties) -> Message {
        if self.is_disabled() {
            debug!(client_id, "listen while disabled");
            return Message::disabled();
        }

        let receiver = {
            let mut registry = self.shared.registry.lock();
            let (generation, receiver) = registry.register(client_id, properties.clone());
            registry.set_refresh(client_id, self.arm_refresh(client_id, generation));

            let from_backlog = registry
                .lookup_mut(client_id)
                .is_some_and(|entry| entry.process_backlog());
            debug!(client_id, generation, from_backlog, "client registered");
            receiver
        };

        // Nobody listening is fine; the hook must never hold up delivery.
        let _ = self.shared.registrations.send(Registration {
            client_id,
            properties,
        });

        match receiver.await {
            Ok(message) => message,
            Err(_) => Message::superseded(),
        }
    }

    /// Delivers `message` to `client_id`, waking its parked poll or queueing
    /// it. Sending to a client that has never polled creates its backlog.
    pub fn send(&self, client_id: ClientId, message: Message) -> Delivery {
        let mut registry = self.shared.registry.lock();
        let delivery = registry.entry_or_create(client_id).deliver(message);
        trace!(client_id, ?delivery, "message sent");
        delivery
    }

    /// Sends `message` to each of `client_ids`.
    pub fn send_to_many(&self, client_ids: &[ClientId], message: Message) {
        let mut registry = self.shared.registry.lock();
        for &client_id in client_ids {
            registry
                .entry_or_create(client_id)
                .deliver(message.clone());
        }
        trace!(count = client_ids.len(), "message sent to many");
    }

    /// Sends `message` to every currently known client.
    pub fn broadcast(&self, message: Message) -> usize {
        let mut registry = self.shared.registry.lock();
        let client_ids = registry.client_ids();
        for &client_id in &client_ids {
            registry
                .entry_or_create(client_id)
                .deliver(message.clone());
        }
        debug!(count = client_ids.len(), "message broadcast");
        client_ids.len()
    }

    /// Drops every queued message for `client_id`.
    pub fn clear_backlog(&self, client_id: ClientId) -> Message {
        let mut registry = self.shared.registry.lock();
        if let Some(entry) = registry.lookup_mut(client_id) {
            let dropped = entry.backlog().len();
            entry.clear_backlog();
            debug!(client_id, dropped, "backlog cleared");
        }
        Message::backlog_cleared()
    }

    /// Forgets `client_id`: cancels its timer, drops its backlog and
    /// properties, and releases a parked poll with `Disconnected`.
    pub fn disconnect(&self, client_id: ClientId) -> Message {
        let removed = self.shared.registry.lock().remove(client_id);
        if removed {
            info!(client_id, "client disconnected");
        }
        Message::disconnected()
    }

    pub fn enable(&self) {
        if self.shared.disabled.swap(false, Ordering::SeqCst) {
            info!("broker enabled");
        }
    }

    pub fn disable(&self) {
        if !self.shared.disabled.swap(true, Ordering::SeqCst) {
            info!("broker disabled");
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.disabled.load(Ordering::SeqCst)
    }

    /// Subscribes to registration events, one per `listen` that registers.
    pub fn subscribe_registrations(&self) -> broadcast::Receiver<Registration> {
        self.shared.registrations.subscribe()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids = self.shared.registry.lock().client_ids();
        ids.sort_unstable();
        ids
    }

    pub fn backlog_len(&self, client_id: ClientId) -> usize {
        self.shared
            .registry
            .lock()
            .lookup(client_id)
            .map_or(0, |entry| entry.backlog().len())
    }

    pub fn is_parked(&self, client_id: ClientId) -> bool {
        self.shared
            .registry
            .lock()
            .lookup(client_id)
            .is_some_and(|entry| entry.is_parked())
    }

    pub fn has_refresh_timer(&self, client_id: ClientId) -> bool {
        self.shared
            .registry
            .lock()
            .lookup(client_id)
            .is_some_and(|entry| entry.has_refresh_timer())
    }

    pub fn properties(&self, client_id: ClientId) -> Option<Properties> {
        self.shared
            .registry
            .lock()
            .lookup(client_id)
            .map(|entry| entry.properties().clone())
    }

    fn arm_refresh(&self, client_id: ClientId, generation: u64) -> RefreshTimer {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        RefreshTimer::start(self.shared.keepalive, move || {
            if let Some(shared) = shared.upgrade() {
                shared.fire_refresh(client_id, generation);
            }
        })
    }
}
