use mvs_server::{config::ServerConfig, run, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = ServerConfig::load()?;
    info!("Starting server on {}:{}", args.listen_address, args.port);
    run(args).await
}
