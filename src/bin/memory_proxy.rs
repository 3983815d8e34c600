use persona_chat::{
    config::ProxyConfig,
    proxy::{start_server, MemoryService},
    store::build_store,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = ProxyConfig::from_env()?;

    info!("🗂️  Memory Store Proxy");
    info!("📍 Port: {}", config.port);

    let service = MemoryService::new(build_store(&config));

    start_server(service, config.port).await?;

    Ok(())
}
