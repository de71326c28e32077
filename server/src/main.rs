use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Human players to wait for (1-4); remaining seats go to bots
    #[arg(short = 'n', long, default_value = "2")]
    players: usize,

    /// Leave the remaining seats empty instead of seating bots
    #[arg(long)]
    no_bots: bool,

    /// Milliseconds between bot turn checks
    #[arg(long, default_value = "2000")]
    bot_interval_ms: u64,

    /// Milliseconds to wait for pending joins before starting
    #[arg(long, default_value = "2000")]
    grace_ms: u64,

    /// Milliseconds a single write may take before the client is dropped
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,

    /// Outgoing messages buffered per client
    #[arg(long, default_value = "64")]
    queue_capacity: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            players: self.players,
            bots: !self.no_bots,
            bot_interval: Duration::from_millis(self.bot_interval_ms),
            join_grace: Duration::from_millis(self.grace_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            queue_capacity: self.queue_capacity,
        }
        .with_players(self.players)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = Args::parse().into_config();
    info!(
        "Starting server for {} player(s), {} bot(s)",
        config.target_players(),
        config.bot_count()
    );

    let server = Server::bind(config).await?;

    let session = tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C before the session started, shutting down");
            return Ok(());
        }
    };

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");
    session.shutdown().await;

    Ok(())
}
