// Relay WhatsApp AI Chatbot
// Main entry point for the relay binary

use clap::Parser;
use relay_engine::cli::{Cli, Command};
use relay_engine::config::Config;
use relay_engine::handlers::{handle_chat, handle_check, handle_serve, OutputFormat};
use relay_engine::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;

    // --log wins over config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry(log_level);

    tracing::info!(
        "Relay v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Serve => {
            tracing::info!(
                provider = %config.llm.provider,
                debug = config.core.debug,
                "Starting webhook server..."
            );
            handle_serve(&config).await
        }
        Command::Chat { sender } => handle_chat(&config, &sender).await,
        Command::Check => handle_check(&config, format).await,
    }
}
