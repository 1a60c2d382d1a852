//! The `client` module is the polling side of `pollnotify`.
//!
//! It provides `NotifierClient`, which connects to a broker over WebSocket,
//! issues `listen` calls and the administrative calls, and can run the usual
//! "listen, handle, listen again" loop.

pub mod notifier_client;
pub use notifier_client::{NotifierClient, default_client_id, describe};
