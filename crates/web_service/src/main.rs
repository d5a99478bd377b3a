use clap::Parser;
use std::io;

use chat_core::ChatConfig;
use web_service::state::AppState;

#[derive(Parser, Debug, Clone)]
#[command(name = "chat-server")]
#[command(about = "Branching chat backend with live SSE delivery")]
#[command(version)]
struct Cli {
    /// Server port
    #[arg(long, env = "PORT", default_value = "8081")]
    port: u16,

    /// Completion backend base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    llm_base_url: String,

    /// Completion model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Completion backend API key
    #[arg(long, env = "LLM_API_KEY", default_value = "sk-test")]
    api_key: String,

    /// Size, in characters, of each progressive delivery slice
    #[arg(long, env = "CHUNK_SIZE", default_value = "64")]
    chunk_size: usize,

    /// Delay between delivery slices, in milliseconds
    #[arg(long, env = "CHUNK_DELAY_MS", default_value = "30")]
    chunk_delay_ms: u64,

    /// Liveness ping interval, in seconds
    #[arg(long, env = "PING_INTERVAL_SECS", default_value = "25")]
    ping_interval_secs: u64,
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    log::info!("Starting chat server on port {}", cli.port);
    log::info!("Completion backend:");
    log::info!("  Base URL: {}", cli.llm_base_url);
    log::info!("  Model: {}", cli.model);

    let config = ChatConfig {
        chunk_size: cli.chunk_size,
        chunk_delay_ms: cli.chunk_delay_ms,
        ping_interval_secs: cli.ping_interval_secs,
        ..Default::default()
    };

    let state = AppState::with_openai_backend(config, cli.api_key, cli.llm_base_url, cli.model);
    web_service::server::run(state, cli.port).await
}
