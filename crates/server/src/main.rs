use allianceforge_server::ServerConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "allianceforge-server", about = "Alliance Forge commander and chat API")]
struct Args {
    /// YAML config file; CLI flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    addr: Option<SocketAddr>,
    /// SQLite database path.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("allianceforge_server=info,allianceforge_engine=info")
        }))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = args.addr {
        config.addr = addr;
    }
    if let Some(db) = args.db {
        config.db_path = db;
    }

    tracing::info!(db = %config.db_path.display(), "starting allianceforge server");
    allianceforge_server::serve(config).await
}
