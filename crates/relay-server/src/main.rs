//! Relay Server - Main entry point

use anyhow::Result;
use relay_common::logging::{init_logging, LogConfig};
use tracing::info;

use relay_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults first, LOG_* environment variables take precedence
    let log_config = LogConfig::builder()
        .log_file_prefix("relay-server".to_string())
        .filter_directives("relay_server=debug,tower_http=debug,reqwest=info".to_string())
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Relay Server");

    let config = Config::load()?;
    info!(
        object_store = %config.backends.object_store.url,
        blob_store = %config.backends.blob_store.url,
        rules_engine = %config.backends.rules_engine.url,
        indexer = %config.backends.indexer.url,
        "Configuration loaded - server will bind to {}:{}",
        config.server.host,
        config.server.port
    );

    api::serve(config).await
}
