use persona_chat::{
    config::GatewayConfig,
    gateway::{
        start_server, ConversationService, GeminiClient, MemoryProxyClient, ReplyGenerator,
        SpeechClient,
    },
};
use std::sync::Arc;
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

    let config = GatewayConfig::from_env()?;

    info!("🚀 Conversation Gateway");
    info!("📍 Port: {}", config.port);
    info!("🧠 Memory proxy: {}", config.memory_proxy_url);

    // Create components
    let memory = Arc::new(MemoryProxyClient::new(&config.memory_proxy_url)?);
    let generator = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    )?);
    let transcriber = Arc::new(SpeechClient::new(config.speech_api_key.clone())?);

    let conversation = Arc::new(ConversationService::new(
        memory.clone(),
        ReplyGenerator::new(generator, memory),
        transcriber,
    ));

    info!("✅ Gateway initialized");

    start_server(conversation, &config.static_dir, config.port).await?;

    Ok(())
}
