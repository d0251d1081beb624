//! CLI for pubsub-udp
//!
//! Subcommands:
//! - `server`: run the relay (the default)
//! - `client`: subscribe to a topic, optionally publish, print what arrives

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use pubsub_udp::config::load_config;
use pubsub_udp::transport::udp::start_udp_server;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pubsub-udp")]
enum Command {
    /// Start the UDP relay
    Server,
    /// Run a smoke-test client against a relay
    Client {
        /// Relay address
        #[arg(long, default_value = "127.0.0.1:40001")]
        server: SocketAddr,
        /// Topic to subscribe to
        #[arg(long)]
        topic: String,
        /// JSON value to publish on the topic after subscribing
        #[arg(long)]
        publish: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cmd = if std::env::args().len() > 1 {
        Command::parse()
    } else {
        Command::Server
    };

    match cmd {
        Command::Server => run_server().await,
        Command::Client {
            server,
            topic,
            publish,
        } => {
            pubsub_udp::utils::logging::init("info");
            if let Err(e) = run_client(server, &topic, publish.as_deref()).await {
                error!("Client failed: {e}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
    }
}

async fn run_server() -> ExitCode {
    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            pubsub_udp::utils::logging::init("info");
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    pubsub_udp::utils::logging::init(&settings.log_level);

    tokio::select! {
        result = start_udp_server(&settings) => {
            if let Err(e) = result {
                error!("Server failed: {e}");
            }
            // the relay only returns on a fatal error
            ExitCode::FAILURE
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            ExitCode::SUCCESS
        }
    }
}

async fn run_client(
    server: SocketAddr,
    topic: &str,
    publish: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::{Value, json};
    use tokio::net::UdpSocket;

    let bind: SocketAddr = if server.is_ipv4() {
        "0.0.0.0:0".parse()?
    } else {
        "[::]:0".parse()?
    };
    let socket = UdpSocket::bind(bind).await?;
    socket.connect(server).await?;

    let subscribe = json!({ "type": "sub", "topic": topic });
    socket.send(subscribe.to_string().as_bytes()).await?;
    info!("subscribed to \"{topic}\" via {server}");

    if let Some(raw) = publish {
        let data: Value = serde_json::from_str(raw)?;
        let publish = json!({ "type": "pub", "topic": topic, "data": data });
        socket.send(publish.to_string().as_bytes()).await?;
        info!("published to \"{topic}\"");
    }

    let mut buf = vec![0u8; 65_535];
    loop {
        tokio::select! {
            received = socket.recv(&mut buf) => {
                let len = received?;
                println!("{}", String::from_utf8_lossy(&buf[..len]));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let unsubscribe = json!({ "type": "unsub", "topic": topic });
    socket.send(unsubscribe.to_string().as_bytes()).await?;
    Ok(())
}
