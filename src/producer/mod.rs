//! The `producer` module holds the traffic side of the system: the `Sender`
//! capability the broker exposes to anything that produces messages, and the
//! `Pulsar` generator that emits messages at a fixed, random or burst pace.

pub mod pulsar;
pub mod sender;

pub use pulsar::{Pulsar, PulsarHandle, PulsarReport, SendType, Target};
pub use sender::Sender;
