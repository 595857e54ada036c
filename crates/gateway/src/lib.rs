//! HTTP API gateway for finrag.
//!
//! Exposes a health check and the v1 retrieval, answering, and advisor
//! endpoints over one shared pipeline.
//!
//! Built on Axum for async HTTP.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use finrag_config::AppConfig;
use finrag_core::index::VectorIndex;
use finrag_index::JsonlIndex;
use finrag_rag::Pipeline;

pub use api_v1::{ApiState, SharedApiState};

/// Build the full router: `/health` plus the v1 API nested under `/v1`.
pub fn build_router(api_state: SharedApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Providers, index, and pipeline are built once and shared by every
/// request.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let providers = finrag_providers::build_from_config(&config)?;
    let index = JsonlIndex::open(&config.index.path)?;
    info!(
        path = %config.index.path.display(),
        records = index.count().await?,
        "Index loaded"
    );

    let pipeline = Pipeline::new(
        providers.generation,
        providers.embedding,
        Arc::new(index),
        &config,
    );
    let state = Arc::new(ApiState::new(
        pipeline,
        Duration::from_secs(config.gateway.request_timeout_secs),
    ));

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting with v1 API");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use finrag_core::error::ProviderError;
    use finrag_core::provider::{
        EmbeddingProvider, GenerationProvider, GenerationRequest, GenerationResult,
    };
    use finrag_index::InMemoryIndex;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct Silent;

    #[async_trait]
    impl GenerationProvider for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResult, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }

        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn test_state() -> SharedApiState {
        let pipeline = Pipeline::new(
            Arc::new(Silent),
            Arc::new(Silent),
            Arc::new(InMemoryIndex::new()),
            &AppConfig::default(),
        );
        Arc::new(ApiState::new(pipeline, Duration::from_secs(90)))
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn v1_routes_are_nested() {
        let app = build_router(test_state());

        let req = Request::builder()
            .method("POST")
            .uri("/v1/rag/retrieve")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"anything"}"#))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["chunks"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = build_router(test_state());
        let req = Request::builder()
            .uri("/v1/chat")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn generation_failure_is_internal_error() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/v1/rag/ask")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"What is KYC?"}"#))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn start_fails_before_binding_without_api_key() {
        let mut config = AppConfig::default();
        config.api_key = None;
        config.provider.kind = "gemini".into();
        config.gateway.port = 0;

        let err = start(config).await.unwrap_err();
        assert!(err.to_string().contains("No API key"));
    }
}
