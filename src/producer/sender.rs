use crate::broker::{Broker, ClientId, Message};

/// Something a producer can push messages into.
///
/// The broker is the real implementation; tests substitute a recorder.
pub trait Sender: Send + Sync {
    fn send(&self, client_id: ClientId, message: Message);

    fn send_to_many(&self, client_ids: &[ClientId], message: Message) {
        for &client_id in client_ids {
            self.send(client_id, message.clone());
        }
    }

    fn broadcast(&self, message: Message);
}

impl Sender for Broker {
    fn send(&self, client_id: ClientId, message: Message) {
        Broker::send(self, client_id, message);
    }

    fn send_to_many(&self, client_ids: &[ClientId], message: Message) {
        Broker::send_to_many(self, client_ids, message);
    }

    fn broadcast(&self, message: Message) {
        Broker::broadcast(self, message);
    }
}
