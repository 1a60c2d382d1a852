//! CLI for PollNotify
//!
//! Subcommands:
//! - `server`: run the broker behind its WebSocket transport
//! - `listen`: long-poll as a client and print what arrives
//! - `send`, `broadcast`, `clear-backlog`, `disconnect`, `enable`, `disable`:
//!   one-shot calls against a running server

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pollnotify::broker::{Broker, ClientId, Message, MessageKind, Properties};
use pollnotify::client::{NotifierClient, default_client_id, describe};
use pollnotify::config::{Settings, load_config};
use pollnotify::producer::Pulsar;
use pollnotify::transport::start_websocket_server;
use pollnotify::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pollnotify", about = "Long-poll notification broker")]
struct Cli {
    /// WebSocket server URL (defaults to `client.url` from the configuration)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the broker server
    Server,
    #[command(flatten)]
    Call(Call),
}

/// Calls made against a running server.
#[derive(Subcommand)]
enum Call {
    /// Poll for messages until interrupted
    Listen {
        /// Client id to poll as (defaults to this process id)
        #[arg(long)]
        client_id: Option<ClientId>,
        /// Property attached to the registration, as key=value (repeatable)
        #[arg(long = "property", value_parser = parse_property)]
        properties: Vec<(String, String)>,
    },
    /// Send a text message to one or more clients
    Send {
        #[arg(long = "client-id", required = true, num_args = 1..)]
        client_ids: Vec<ClientId>,
        text: String,
    },
    /// Send a text message to every known client
    Broadcast { text: String },
    /// Drop a client's queued messages
    ClearBacklog { client_id: ClientId },
    /// Forget a client entirely
    Disconnect { client_id: ClientId },
    /// Let `listen` calls through again
    Enable,
    /// Answer every `listen` with `Disabled`
    Disable,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&settings.server.log_level);

    let cli = Cli::parse();
    let url = cli.url.clone().unwrap_or_else(|| settings.client.url.clone());

    let result = match cli.command {
        Command::Server => run_server(settings).await,
        Command::Call(call) => run_client(&url, &settings, call).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let broker = Broker::new(&settings.broker);

    let mut registrations = broker.subscribe_registrations();
    tokio::spawn(async move {
        while let Ok(registration) = registrations.recv().await {
            info!(
                client_id = registration.client_id,
                properties = %serde_json::Value::Object(registration.properties),
                "client registered"
            );
        }
    });

    let pulsar = if settings.pulsar.enabled {
        let pulsar = Pulsar::try_from(&settings.pulsar)?;
        Some(pulsar.spawn(Arc::new(broker.clone())))
    } else {
        None
    };

    tokio::select! {
        result = start_websocket_server(&addr, broker) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    if let Some(pulsar) = pulsar {
        pulsar.stop();
        let report = pulsar.join().await?;
        info!(
            "Pulsar {} sent {} messages",
            report.trigger_id, report.messages_sent
        );
    }

    Ok(())
}

async fn run_client(
    url: &str,
    settings: &Settings,
    call: Call,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = NotifierClient::connect(url).await?;

    match call {
        Call::Listen {
            client_id,
            properties,
        } => {
            let client_id = client_id.unwrap_or_else(default_client_id);
            let properties: Properties = properties
                .into_iter()
                .map(|(key, value)| (key, serde_json::Value::String(value)))
                .collect();
            info!(client_id, url, "listening");

            let retry = Duration::from_secs(settings.client.disabled_retry_secs);
            tokio::select! {
                result = client.listen_loop(client_id, properties, retry, |message| {
                    println!("{}", describe(message));
                    ControlFlow::Continue(())
                }) => result?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping listener.");
                }
            }
            return Ok(());
        }
        Call::Send { client_ids, text } => {
            let message = Message::text(MessageKind::Message, &text);
            if client_ids.len() == 1 {
                client.send(client_ids[0], message).await?;
            } else {
                client.send_to_many(client_ids, message).await?;
            }
        }
        Call::Broadcast { text } => {
            client
                .broadcast(Message::text(MessageKind::Broadcast, &text))
                .await?;
        }
        Call::ClearBacklog { client_id } => {
            println!("{}", client.clear_backlog(client_id).await?.payload_text());
        }
        Call::Disconnect { client_id } => {
            println!("{}", client.disconnect(client_id).await?.payload_text());
        }
        Call::Enable => client.enable().await?,
        Call::Disable => client.disable().await?,
    }

    client.close().await?;
    Ok(())
}
