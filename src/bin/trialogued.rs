//! Trialogue HTTP server.
//!
//! Configuration comes from the environment, see [`trialogue::TrialogueConfig`]. A `.env` file
//! in the working directory is loaded first; variables already set in the process win.
//!
//! ```text
//! ANTHROPIC_API_KEY=... DEEPSEEK_API_KEY=... RUST_LOG=info cargo run --bin trialogued
//! ```

use trialogue::TrialogueConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // .env may set RUST_LOG, so it is loaded before the logger.
    let config = TrialogueConfig::load();
    trialogue::init_logger();
    let config = config?;
    log::info!("trialogued: starting with {:?}", config);
    if config.anthropic_api_key.is_none() {
        log::warn!("trialogued: ANTHROPIC_API_KEY is not set, Claude turns will fail");
    }
    if config.deepseek_api_key.is_none() {
        log::warn!("trialogued: DEEPSEEK_API_KEY is not set, DeepSeek turns will fail");
    }

    trialogue::server::serve(config).await
}
