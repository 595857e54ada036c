//! HTTP API v1: retrieval and answering over the shared pipeline.
//!
//! Endpoints:
//!
//! - `POST /v1/rag/retrieve`  Contextualize and fetch chunks, no generation
//! - `POST /v1/rag/ask`       Grounded answer with sources
//! - `POST /v1/advisor`       Profile-aware answer plus next-turn memory
//!
//! Every request runs under its own cancellation token. The token fires when
//! the client disconnects (the handler future is dropped) or when the
//! configured request timeout elapses.

use axum::{Router, extract::State, http::StatusCode, response::Json, routing::post};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use finrag_core::error::{Error, ProviderError};
use finrag_core::memory::CompressedMemory;
use finrag_core::message::TurnHistory;
use finrag_core::profile::FinancialProfile;
use finrag_rag::{AnswerResult, Pipeline};

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiState {
    pub pipeline: Arc<Pipeline>,
    pub request_timeout: Duration,
}

impl ApiState {
    pub fn new(pipeline: Pipeline, request_timeout: Duration) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout,
        }
    }
}

pub type SharedApiState = Arc<ApiState>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/rag/retrieve", post(retrieve_handler))
        .route("/rag/ask", post(ask_handler))
        .route("/advisor", post(advisor_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest {
    query: String,
    #[serde(default)]
    history: Option<TurnHistory>,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub sources: BTreeSet<String>,
    pub chunks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    query: String,
    #[serde(default)]
    history: Option<TurnHistory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdvisorRequest {
    query: String,
    /// Memory returned by the previous advisor call
    #[serde(default)]
    history: Option<CompressedMemory>,
    #[serde(default)]
    recent_turns: TurnHistory,
    profile: FinancialProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdvisorResponse {
    pub answer: String,
    /// Pass back unchanged as `history` on the next call
    pub history: CompressedMemory,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// ── Handlers ──────────────────────────────────────────────────────────────

async fn retrieve_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let pipeline = state.pipeline.clone();
    let result = run_request(state.request_timeout, "retrieve", move |cancel| async move {
        pipeline
            .retrieve_context(&payload.query, payload.history.as_ref(), payload.top_k, &cancel)
            .await
            .map(|r| RetrieveResponse {
                rewritten_query: r.rewritten_query(&payload.query).map(str::to_string),
                sources: r.sources,
                chunks: r.chunks,
            })
    })
    .await?;
    Ok(Json(result))
}

async fn ask_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<AskRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    let pipeline = state.pipeline.clone();
    let result = run_request(state.request_timeout, "ask", move |cancel| async move {
        pipeline
            .answer(&payload.query, payload.history.as_ref(), &cancel)
            .await
    })
    .await?;
    Ok(Json(result))
}

async fn advisor_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<AdvisorRequest>,
) -> Result<Json<AdvisorResponse>, ApiError> {
    let pipeline = state.pipeline.clone();
    let result = run_request(state.request_timeout, "advisor", move |cancel| async move {
        pipeline
            .answer_personalized_for(
                &payload.profile,
                &payload.query,
                payload.history,
                payload.recent_turns,
                &cancel,
            )
            .await
    })
    .await?;
    Ok(Json(AdvisorResponse {
        answer: result.answer,
        history: result.new_compressed_memory,
    }))
}

// ── Request lifecycle ─────────────────────────────────────────────────────

/// Run one pipeline call inside a `request_id` span with a timeout.
///
/// The token is cancelled on every exit path, including the handler future
/// being dropped mid-flight.
async fn run_request<T, F, Fut>(
    timeout: Duration,
    route: &'static str,
    work: F,
) -> Result<T, ApiError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = finrag_core::error::Result<T>>,
{
    let request_id = Uuid::new_v4();
    let span = info_span!("request", %request_id, route);

    async move {
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        info!("Request started");

        match tokio::time::timeout(timeout, work(cancel.clone())).await {
            Ok(Ok(value)) => {
                info!("Request completed");
                Ok(value)
            }
            Ok(Err(e)) => Err(api_error(e)),
            Err(_) => {
                cancel.cancel();
                warn!(timeout_secs = timeout.as_secs(), "Request timed out");
                Err((
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(ErrorResponse {
                        error: format!("Request timed out after {}s", timeout.as_secs()),
                    }),
                ))
            }
        }
    }
    .instrument(span)
    .await
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        e if e.is_rate_limited() => StatusCode::SERVICE_UNAVAILABLE,
        e if e.is_cancelled() => StatusCode::GATEWAY_TIMEOUT,
        Error::Provider(ProviderError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(e: Error) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        error!(%status, error = %e, "Request failed");
    } else {
        warn!(%status, error = %e, "Request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}
