use clap::Parser;
use client::network::Client;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Name to join with
    #[arg(short = 'n', long)]
    name: String,

    /// Roll automatically whenever it is your turn
    #[arg(short = 'a', long)]
    auto_roll: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Connecting to: {}", args.server);
    println!("Commands: /roll, /w <name> <message>, /who, /chats, /quit. Anything else is public chat.");

    let mut client = Client::connect(&args.server, &args.name, args.auto_roll).await?;
    client.run().await?;

    Ok(())
}
