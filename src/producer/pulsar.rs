//! Pulse generator
//!
//! A `Pulsar` emits `"Pulse Number N"` messages into a [`Sender`] until it
//! reaches its message cap, runs out of time, or is stopped. Useful for load
//! and smoke testing a running broker.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::broker::{ClientId, Message, MessageKind};
use crate::config::PulsarSettings;
use crate::producer::Sender;
use crate::utils::error::ProducerError;

/// How long a pulsar pauses between two messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendType {
    /// Fixed interval.
    Normal,
    /// No pause at all.
    Burst,
    /// Uniformly random pause in `[min, max)`; `min` when the range is empty.
    Random { min: Duration, max: Duration },
}

/// Who receives the pulses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Client(ClientId),
    Many(Vec<ClientId>),
    Broadcast,
}

impl std::str::FromStr for Target {
    type Err = ProducerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("broadcast") {
            return Ok(Self::Broadcast);
        }

        let ids = trimmed
            .split(',')
            .map(|part| part.trim().parse::<ClientId>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ProducerError::InvalidTarget(s.to_string()))?;

        match ids.as_slice() {
            [] => Err(ProducerError::InvalidTarget(s.to_string())),
            [single] => Ok(Self::Client(*single)),
            _ => Ok(Self::Many(ids)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pulsar {
    pub trigger_id: String,
    pub interval: Duration,
    pub send_type: SendType,
    /// Stop after this many messages; `0` means no cap.
    pub max_messages: u64,
    pub max_runtime: Option<Duration>,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulsarReport {
    pub trigger_id: String,
    pub messages_sent: u64,
}

/// A running pulsar.
#[derive(Debug)]
pub struct PulsarHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<PulsarReport>,
}

impl PulsarHandle {
    /// Asks the pulsar to stop after the message it is currently sending.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Waits for the pulsar to finish and returns what it did.
    pub async fn join(self) -> Result<PulsarReport, tokio::task::JoinError> {
        self.task.await
    }
}

impl TryFrom<&PulsarSettings> for Pulsar {
    type Error = ProducerError;

    fn try_from(settings: &PulsarSettings) -> Result<Self, Self::Error> {
        let send_type = match settings.send_type.to_lowercase().as_str() {
            "burst" => SendType::Burst,
            "random" => {
                if settings.min_interval_ms >= settings.max_interval_ms {
                    return Err(ProducerError::InvalidInterval {
                        min: settings.min_interval_ms,
                        max: settings.max_interval_ms,
                    });
                }
                SendType::Random {
                    min: Duration::from_millis(settings.min_interval_ms),
                    max: Duration::from_millis(settings.max_interval_ms),
                }
            }
            _ => SendType::Normal,
        };

        Ok(Self {
            trigger_id: settings.trigger_id.clone(),
            interval: Duration::from_millis(settings.interval_ms),
            send_type,
            max_messages: settings.max_messages,
            max_runtime: (settings.max_runtime_secs > 0)
                .then(|| Duration::from_secs(settings.max_runtime_secs)),
            target: settings.target.parse()?,
        })
    }
}

impl Pulsar {
    /// Starts the pulsar on the current runtime.
    pub fn spawn(self, sender: Arc<dyn Sender>) -> PulsarHandle {
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(sender, stop_rx));
        PulsarHandle { stop, task }
    }

    async fn run(self, sender: Arc<dyn Sender>, mut stop: watch::Receiver<bool>) -> PulsarReport {
        let deadline = self.max_runtime.map(|runtime| Instant::now() + runtime);
        let mut sent: u64 = 0;

        info!(trigger_id = %self.trigger_id, target = ?self.target, "pulsar started");

        loop {
            if self.max_messages > 0 && sent >= self.max_messages {
                break;
            }
            if *stop.borrow() || deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }

            self.emit(sender.as_ref(), sent);
            sent += 1;

            let pause = self.next_pause();
            if pause.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }

            let expire = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = expire => break,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!(trigger_id = %self.trigger_id, messages_sent = sent, "pulsar finished");
        PulsarReport {
            trigger_id: self.trigger_id,
            messages_sent: sent,
        }
    }

    fn emit(&self, sender: &dyn Sender, sequence: u64) {
        let body = format!("Pulse Number {sequence}");
        match &self.target {
            Target::Client(client_id) => {
                sender.send(*client_id, Message::text(MessageKind::Message, &body));
            }
            Target::Many(client_ids) => {
                sender.send_to_many(client_ids, Message::text(MessageKind::Message, &body));
            }
            Target::Broadcast => {
                sender.broadcast(Message::text(MessageKind::Broadcast, &body));
            }
        }
        debug!(trigger_id = %self.trigger_id, sequence, "pulse emitted");
    }

    fn next_pause(&self) -> Duration {
        match self.send_type {
            SendType::Normal => self.interval,
            SendType::Burst => Duration::ZERO,
            SendType::Random { min, max } if min < max => rand::thread_rng().gen_range(min..max),
            SendType::Random { min, .. } => min,
        }
    }
}
