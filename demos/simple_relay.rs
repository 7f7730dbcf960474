//! Simple signaling relay example
//!
//! Run with: cargo run --example simple_relay [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_relay                    # binds to 0.0.0.0:5000
//!   cargo run --example simple_relay localhost          # binds to 127.0.0.1:5000
//!   cargo run --example simple_relay 127.0.0.1:5001     # binds to 127.0.0.1:5001
//!
//! ## Talking to it
//!
//! Connect a WebSocket to ws://localhost:5000 and send one JSON object per
//! text frame. The first frame must claim an identity:
//!
//!   {"type": "register", "identity": "alice", "displayName": "Alice"}
//!
//! Then join a room and negotiate with the peers it reports:
//!
//!   {"type": "join-room", "roomId": "standup"}
//!   {"type": "offer", "targetConnectionId": 2, "sdpOffer": {"sdp": "..."}}
//!
//! Or ring a user directly by identity:
//!
//!   {"type": "direct-call", "calleeIdentity": "bob", "sdpOffer": {"sdp": "..."}}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use signal_rs::{ServerConfig, SignalServer};

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:5000
/// - "localhost:5001" -> 127.0.0.1:5001
/// - "127.0.0.1" -> 127.0.0.1:5000
/// - "0.0.0.0:5000" -> 0.0.0.0:5000
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 5000;

    // Replace "localhost" with "127.0.0.1"
    let normalized = arg.replace("localhost", "127.0.0.1");

    // Try parsing as SocketAddr first (includes port)
    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Try parsing as IP address without port
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: simple_relay [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:5000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  simple_relay                     # binds to 0.0.0.0:5000");
    eprintln!("  simple_relay localhost           # binds to 127.0.0.1:5000");
    eprintln!("  simple_relay 127.0.0.1:5001      # binds to 127.0.0.1:5001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => "0.0.0.0:5000".parse().unwrap(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_rs=debug".parse()?)
                .add_directive("simple_relay=info".parse()?),
        )
        .init();

    let config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    println!("Starting signaling relay on {}", config.bind_addr);
    println!();
    println!("Connect a WebSocket to ws://{}", config.bind_addr);
    println!("First frame: {{\"type\": \"register\", \"identity\": \"alice\"}}");
    println!();

    let server = Arc::new(SignalServer::new(config));

    // Periodic stats line so an idle relay still shows signs of life
    let stats = Arc::clone(server.stats());
    let registry = Arc::clone(server.registry());
    let rooms = Arc::clone(server.rooms());
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        ticker.tick().await; // skip the immediate first tick
        loop {
            ticker.tick().await;
            let snapshot = stats.snapshot();
            let connections = registry.connection_count().await;
            let rooms_count = rooms.room_count().await;
            tracing::info!(
                connections = connections,
                rooms = rooms_count,
                relayed = snapshot.relays_delivered,
                dropped = snapshot.relays_dropped,
                "Relay stats"
            );
        }
    });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
