use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the broker, the listening client and the
/// optional built-in pulse producer.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub client: ClientSettings,
    pub pulsar: PulsarSettings,
}

/// Configuration settings for the server.
///
/// Defines the address the server binds to and its default log level.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

/// Configuration settings for the broker.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    /// Seconds a poll may stay parked before a refresh message resolves it.
    /// Values below one second are raised to one.
    pub keepalive_secs: u64,
    /// Capacity of the registration event channel.
    pub registration_buffer: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientSettings {
    pub url: String,
    /// Pause before polling again after a `Disabled` reply.
    pub disabled_retry_secs: u64,
}

/// Built-in pulse producer, started with the server when `enabled`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PulsarSettings {
    pub enabled: bool,
    pub trigger_id: String,
    pub interval_ms: u64,
    /// `normal`, `burst` or `random`.
    pub send_type: String,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_messages: u64,
    pub max_runtime_secs: u64,
    /// `broadcast` or a comma separated list of client ids.
    pub target: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub client: Option<PartialClientSettings>,
    pub pulsar: Option<PartialPulsarSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub keepalive_secs: Option<u64>,
    pub registration_buffer: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialClientSettings {
    pub url: Option<String>,
    pub disabled_retry_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialPulsarSettings {
    pub enabled: Option<bool>,
    pub trigger_id: Option<String>,
    pub interval_ms: Option<u64>,
    pub send_type: Option<String>,
    pub min_interval_ms: Option<u64>,
    pub max_interval_ms: Option<u64>,
    pub max_messages: Option<u64>,
    pub max_runtime_secs: Option<u64>,
    pub target: Option<String>,
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
            broker: BrokerSettings {
                keepalive_secs: 13,
                registration_buffer: 64,
            },
            client: ClientSettings {
                url: "ws://127.0.0.1:8080".to_string(),
                disabled_retry_secs: 10,
            },
            pulsar: PulsarSettings {
                enabled: false,
                trigger_id: "pulsar".to_string(),
                interval_ms: 1000,
                send_type: "normal".to_string(),
                min_interval_ms: 100,
                max_interval_ms: 1000,
                max_messages: 0,
                max_runtime_secs: 0,
                target: "broadcast".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fills every missing value from `defaults`.
    pub fn merge(self, defaults: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let client = self.client.unwrap_or_default();
        let pulsar = self.pulsar.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(defaults.server.host),
                port: server.port.unwrap_or(defaults.server.port),
                log_level: server.log_level.unwrap_or(defaults.server.log_level),
            },
            broker: BrokerSettings {
                keepalive_secs: broker
                    .keepalive_secs
                    .unwrap_or(defaults.broker.keepalive_secs),
                registration_buffer: broker
                    .registration_buffer
                    .unwrap_or(defaults.broker.registration_buffer),
            },
            client: ClientSettings {
                url: client.url.unwrap_or(defaults.client.url),
                disabled_retry_secs: client
                    .disabled_retry_secs
                    .unwrap_or(defaults.client.disabled_retry_secs),
            },
            pulsar: PulsarSettings {
                enabled: pulsar.enabled.unwrap_or(defaults.pulsar.enabled),
                trigger_id: pulsar.trigger_id.unwrap_or(defaults.pulsar.trigger_id),
                interval_ms: pulsar.interval_ms.unwrap_or(defaults.pulsar.interval_ms),
                send_type: pulsar.send_type.unwrap_or(defaults.pulsar.send_type),
                min_interval_ms: pulsar
                    .min_interval_ms
                    .unwrap_or(defaults.pulsar.min_interval_ms),
                max_interval_ms: pulsar
                    .max_interval_ms
                    .unwrap_or(defaults.pulsar.max_interval_ms),
                max_messages: pulsar.max_messages.unwrap_or(defaults.pulsar.max_messages),
                max_runtime_secs: pulsar
                    .max_runtime_secs
                    .unwrap_or(defaults.pulsar.max_runtime_secs),
                target: pulsar.target.unwrap_or(defaults.pulsar.target),
            },
        }
    }
}
