use clap::Parser;
use log::{error, info};
use server::broadcast::BroadcastMode;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Snapshot broadcasts per second
    #[clap(short, long, default_value = "30")]
    tick_rate: u32,
    /// Pickups placed at startup
    #[clap(long, default_value = "100")]
    pickups: usize,
    /// Delay before a consumed pickup is replaced, in milliseconds
    #[clap(long, default_value = "15000")]
    respawn_ms: u64,
    /// Broadcast after every move instead of on a fixed tick
    #[clap(long)]
    per_move: bool,
    /// Minimum time between per-move broadcasts from one sender, in milliseconds
    #[clap(long, requires = "per_move")]
    throttle_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let broadcast_mode = if self.per_move {
            BroadcastMode::PerMove {
                throttle: self.throttle_ms.map(Duration::from_millis),
            }
        } else {
            BroadcastMode::FixedTick
        };

        ServerConfig {
            host: self.host,
            port: self.port,
            tick_rate: self.tick_rate,
            initial_pickups: self.pickups,
            respawn_delay: Duration::from_millis(self.respawn_ms),
            broadcast_mode,
        }
    }
}

/// Parses command-line arguments, starts the server and waits for it or Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config();
    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
