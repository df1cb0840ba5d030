//! Civicscape Chat server
//!
//! Entry point: load configuration, set up logging and serve.

use std::sync::Arc;

use anyhow::Context;
use civicscape_chat::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;
use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    let config = AppConfig::load().context("Configuration error")?;

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(config.logging.format);

    server::start_server(Arc::new(config)).await
}
