//! `finrag serve`: start the HTTP API server.

use finrag_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    serve(config).await
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("finrag gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.provider.kind, config.provider.generation_model);
    println!("   Index:     {}", config.index.path.display());

    finrag_gateway::start(config)
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_startup_error_is_reported() {
        let mut config = AppConfig::default();
        config.api_key = None;
        config.provider.kind = "gemini".into();

        let err = serve(config).await.unwrap_err();
        assert!(err.to_string().contains("No API key"));
    }
}
