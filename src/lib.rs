//! # PollNotify
//!
//! `pollnotify` is a server-push notification broker built on long polling.
//! A client blocks on `listen` until the broker has a message for it,
//! receives that message and immediately polls again. Messages for clients
//! that are not currently polling wait in a per-client backlog, and a
//! keepalive timer periodically forces a round-trip so that dead clients are
//! noticed.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: The client registry, the delivery state machine and the refresh timers.
//! - `queue`: The ordered, doubly linked queue used as the per-client backlog.
//! - `producer`: The `Sender` capability and the `Pulsar` traffic generator.
//! - `transport`: The WebSocket server carrying broker calls as JSON frames.
//! - `client`: The polling client and its listen loop.
//! - `config`: Handles loading and managing configuration.
//! - `utils`: Contains shared utilities, such as error handling and logging.

pub mod broker;
pub mod client;
pub mod config;
pub mod producer;
pub mod queue;
pub mod transport;
pub mod utils;
