pub mod ask;
pub mod config_cmd;
pub mod doctor;
pub mod retrieve;
pub mod serve;

use std::sync::Arc;

use finrag_config::AppConfig;
use finrag_index::JsonlIndex;
use finrag_rag::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build a pipeline over the configured providers and on-disk index.
pub fn build_pipeline(config: &AppConfig) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let providers = finrag_providers::build_from_config(config)?;
    let index = JsonlIndex::open(&config.index.path)?;
    Ok(Pipeline::new(
        providers.generation,
        providers.embedding,
        Arc::new(index),
        config,
    ))
}

/// A token that fires on Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}
