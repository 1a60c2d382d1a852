//! Client registry
//!
//! Owns every piece of per-client state: the parked delivery slot of an
//! in-flight `listen`, the backlog of messages produced while the client was
//! not polling, its pending refresh timer and the properties it last
//! registered with.
//!
//! The registry makes no delivery policy decisions beyond "hand to the parked
//! poll if there is one, otherwise queue". It is not synchronized on its own;
//! the broker keeps it behind a single lock so that registration, delivery,
//! timer firing and removal for a client are linearized.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tracing::debug;

use crate::broker::message::{ClientId, Message, Properties};
use crate::broker::refresh::RefreshTimer;
use crate::queue::OrderedQueue;

/// How a message reached its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed straight to a parked `listen`.
    Direct,
    /// Appended to the client's backlog.
    Queued,
}

/// Per-client state.
#[derive(Debug, Default)]
pub struct ClientEntry {
    generation: u64,
    parked: Option<oneshot::Sender<Message>>,
    backlog: OrderedQueue<Message>,
    refresh: Option<RefreshTimer>,
    properties: Properties,
}

impl ClientEntry {
    /// Delivers `message` to the parked poll, or queues it.
    ///
    /// The parked slot is consumed by a direct delivery, so a second message
    /// can never be pushed into a channel nobody waits on. If the poll went
    /// away without being resolved (its receiver was dropped), the message
    /// falls back to the backlog.
    pub fn deliver(&mut self, message: Message) -> Delivery {
        if let Some(parked) = self.parked.take() {
            match parked.send(message) {
                Ok(()) => return Delivery::Direct,
                Err(message) => {
                    debug!("parked poll was abandoned, queueing instead");
                    self.backlog.push_back(message);
                    return Delivery::Queued;
                }
            }
        }

        self.backlog.push_back(message);
        Delivery::Queued
    }

    /// Hands the front of the backlog to the parked poll, if both exist.
    ///
    /// Exactly one message is moved per call; the rest waits for later polls.
    pub fn process_backlog(&mut self) -> bool {
        let Some(parked) = self.parked.take() else {
            return false;
        };
        let Some(message) = self.backlog.pop_front() else {
            self.parked = Some(parked);
            return false;
        };

        match parked.send(message) {
            Ok(()) => true,
            Err(message) => {
                self.backlog.push_front(message);
                false
            }
        }
    }

    pub fn clear_backlog(&mut self) {
        self.backlog.clear();
    }

    pub fn backlog(&self) -> &OrderedQueue<Message> {
        &self.backlog
    }

    pub fn is_parked(&self) -> bool {
        self.parked.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn has_refresh_timer(&self) -> bool {
        self.refresh.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a parked poll, if any, with `message`.
    fn release_parked(&mut self, message: Message) {
        if let Some(parked) = self.parked.take() {
            let _ = parked.send(message);
        }
    }
}

/// Mapping from client id to that client's state.
#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<ClientId, ClientEntry>,
    next_generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh poll for `client_id`.
    ///
    /// Any pending refresh timer is cancelled and any previously parked poll
    /// is released with a "superseded" timeout; the newest poll wins. The
    /// backlog survives re-registration. Returns the registration generation
    /// and the receiving end of the new delivery slot.
    pub fn register(
        &mut self,
        client_id: ClientId,
        properties: Properties,
    ) -> (u64, oneshot::Receiver<Message>) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let entry = self.clients.entry(client_id).or_default();
        entry.refresh = None;
        if entry.is_parked() {
            debug!(client_id, "earlier poll superseded");
        }
        entry.release_parked(Message::superseded());

        let (tx, rx) = oneshot::channel();
        entry.generation = generation;
        entry.parked = Some(tx);
        entry.properties = properties;

        (generation, rx)
    }

    /// Attaches `timer` to the client's current registration.
    pub fn set_refresh(&mut self, client_id: ClientId, timer: RefreshTimer) {
        if let Some(entry) = self.clients.get_mut(&client_id) {
            entry.refresh = Some(timer);
        }
    }

    /// Detaches the refresh timer if it belongs to registration `generation`.
    ///
    /// Returns `false` for a timer that outlived its registration (the client
    /// re-registered or disconnected in the meantime).
    pub fn take_refresh(&mut self, client_id: ClientId, generation: u64) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(entry) if entry.generation == generation && entry.refresh.is_some() => {
                entry.refresh = None;
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, client_id: ClientId) -> Option<&ClientEntry> {
        self.clients.get(&client_id)
    }

    pub fn lookup_mut(&mut self, client_id: ClientId) -> Option<&mut ClientEntry> {
        self.clients.get_mut(&client_id)
    }

    /// Returns the entry for `client_id`, creating a backlog-only one for a
    /// client that has never polled.
    pub fn entry_or_create(&mut self, client_id: ClientId) -> &mut ClientEntry {
        self.clients.entry(client_id).or_default()
    }

    /// Forgets `client_id` entirely.
    ///
    /// The refresh timer is cancelled together with the removal, the backlog
    /// and properties are dropped, and a parked poll is released with a
    /// `Disconnected` message.
    pub fn remove(&mut self, client_id: ClientId) -> bool {
        match self.clients.remove(&client_id) {
            Some(mut entry) => {
                if let Some(timer) = entry.refresh.take() {
                    timer.cancel();
                }
                entry.release_parked(Message::disconnected());
                true
            }
            None => false,
        }
    }

    /// Snapshot of the known client ids.
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
