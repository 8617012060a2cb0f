use clap::Parser;
use clob_engine::{server::EngineServer, utils::shutdown_token};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const DEFAULT_PORT: u16 = 12345;

/// Matching engine server: accepts line-oriented TCP clients, matches
/// limit orders against a single in-memory book, and broadcasts trades.
#[derive(Parser)]
#[command(name = "clob-engine", version, about)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let shutdown = shutdown_token();
    let server = EngineServer::new(cli.port, shutdown);
    server.run().await?;
    Ok(())
}
