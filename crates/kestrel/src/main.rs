use clap::Parser;
use kestrel_engine::cli::{self, Services};
use kestrel_engine::config::loader::ConfigLoader;
use kestrel_engine::resource::ResourceRouter;
use kestrel_engine::store::MappingStore;
use kestrel_engine::tools::ToolRouter;
use kestrel_r::channel::RemoteChannel;
use kestrel_r::server::RemoteServer;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kestrel",
    version,
    about = "Tool dispatcher and learned-mapping store for a remote browser"
)]
struct Args {
    /// Config file (defaults to ./kestrel.yaml, then ~/.kestrel/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address the extension WebSocket server binds to
    #[arg(long)]
    host: Option<IpAddr>,

    /// WebSocket port
    #[arg(long)]
    port: Option<u16>,

    /// How long a remote command may wait for its reply
    #[arg(long)]
    reply_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the request/response stream.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(port) = args.port {
        config.channel.port = port;
    }
    if let Some(timeout) = args.reply_timeout_ms {
        config.channel.reply_timeout_ms = timeout;
    }
    let host: IpAddr = match args.host {
        Some(host) => host,
        None => config.channel.host.parse()?,
    };

    let server = RemoteServer::new(SocketAddr::new(host, config.channel.port));
    let handle = server.start().await?;
    info!(
        "Connect the browser extension to ws://{}",
        handle.local_addr
    );

    let channel = RemoteChannel::new(
        handle,
        Duration::from_millis(config.channel.reply_timeout_ms),
    )
    .with_connect_grace(Duration::from_millis(config.channel.connect_grace_ms));

    let store = MappingStore::new();
    let services = Services {
        tools: ToolRouter::new(Arc::new(channel), store.clone()),
        resources: ResourceRouter::new(store),
    };

    cli::serve_stdio(services).await?;
    info!("Input closed, shutting down");
    Ok(())
}
