//! HTTP front door.
//!
//! Thin layer over the pipeline: routing, per-client rate limiting, and the
//! error-to-status mapping. All domain logic lives in the pipeline; handlers
//! only translate between HTTP and `AnalysisError`.

use crate::analysis::Pipeline;
use crate::cache::Cache;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::limiter::{RateLimit, RateLimiter};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<Cache>,
    pub analyze_limit: RateLimit,
    pub summary_limit: RateLimit,
    pub debug: bool,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, cache: Arc<Cache>, config: &Config) -> Self {
        Self {
            pipeline,
            limiter: Arc::new(RateLimiter::new()),
            cache,
            analyze_limit: RateLimit {
                name: "analyze",
                max_requests: config.limits.analyze_max_requests,
                window: std::time::Duration::from_secs(config.limits.analyze_window_seconds),
            },
            summary_limit: RateLimit {
                name: "summary",
                max_requests: config.limits.summary_max_requests,
                window: std::time::Duration::from_secs(config.limits.summary_window_seconds),
            },
            debug: config.server.debug,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    endereco: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeQuery {
    endereco: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn status_for(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AnalysisError::AddressNotFound => StatusCode::NOT_FOUND,
        AnalysisError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AnalysisError::Upstream(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Upstream detail is only exposed in debug mode; production clients get a
/// generic message for provider failures.
fn error_response(err: &AnalysisError, debug: bool) -> Response {
    let message = match err {
        AnalysisError::Upstream(_) if !debug => {
            "serviço de geocodificação indisponível".to_string()
        }
        _ => err.to_string(),
    };

    (
        status_for(err),
        Json(ErrorBody {
            error: err.kind(),
            message,
        }),
    )
        .into_response()
}

/// Service banner, mirroring what a quick `curl /` should tell a new user.
async fn index() -> impl IntoResponse {
    Json(json!({
        "servico": "UrbanLens",
        "versao": env!("CARGO_PKG_VERSION"),
        "descricao": "Análise de vizinhança para endereços brasileiros",
        "endpoints": {
            "POST /api/analyze": "análise completa de um endereço",
            "POST /api/summary": "resumo da análise",
            "GET /api/geocode": "geocodificação de um endereço (?endereco=)",
            "GET /api/health": "estado do serviço",
        },
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let cache_status = if state.cache.healthy().await {
        "conectado"
    } else {
        "indisponivel"
    };

    Json(json!({
        "status": "ok",
        "cache": cache_status,
        "timestamp": Utc::now(),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let client = addr.ip().to_string();
    if !state.limiter.check(&client, &state.analyze_limit) {
        return error_response(&AnalysisError::RateLimited, state.debug);
    }

    match state.pipeline.analyze(&req.endereco).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(&err, state.debug),
    }
}

async fn summary(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let client = addr.ip().to_string();
    if !state.limiter.check(&client, &state.summary_limit) {
        return error_response(&AnalysisError::RateLimited, state.debug);
    }

    match state.pipeline.summarize(&req.endereco).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(&err, state.debug),
    }
}

async fn geocode(State(state): State<AppState>, Query(query): Query<GeocodeQuery>) -> Response {
    let Some(address) = query.endereco else {
        return error_response(
            &AnalysisError::InvalidInput("parâmetro 'endereco' ausente".to_string()),
            state.debug,
        );
    };

    match state.pipeline.geocode(&address).await {
        Ok(location) => (StatusCode::OK, Json(location)).into_response(),
        Err(err) => error_response(&err, state.debug),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/summary", post(summary))
        .route("/api/geocode", get(geocode))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind and run the HTTP server until the process is stopped.
pub async fn serve(config: &Config, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{}", addr);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
