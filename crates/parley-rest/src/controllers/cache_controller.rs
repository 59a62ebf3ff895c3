//! Cache management and health controller.

use crate::{
    responses::{created, ok, ApiResponse, ApiResult, AppError},
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use parley_service::{CacheService, ConnectionStatus, DetailedStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Request to store a value.
#[derive(Debug, Deserialize)]
struct SetCacheRequest {
    key: String,
    value: serde_json::Value,
    ttl: Option<u64>,
}

/// Request to exercise the wrap (get-or-compute) path.
#[derive(Debug, Deserialize)]
struct WrapTestRequest {
    key: String,
    data: serde_json::Value,
    ttl: Option<u64>,
    /// Simulated compute delay in milliseconds.
    delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GenerateKeyQuery {
    prefix: String,
    parts: Option<String>,
}

#[derive(Debug, Serialize)]
struct CacheValueResponse {
    key: String,
    value: Option<serde_json::Value>,
    found: bool,
}

#[derive(Debug, Serialize)]
struct SetCacheResponse {
    message: &'static str,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DeleteCacheResponse {
    message: &'static str,
    key: String,
}

#[derive(Debug, Serialize)]
struct ClearCacheResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct WrapTestResponse {
    message: &'static str,
    key: String,
    result: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
}

#[derive(Debug, Serialize)]
struct GenerateKeyResponse {
    prefix: String,
    parts: Vec<String>,
    generated_key: String,
}

#[derive(Debug, Serialize)]
struct SimpleHealthResponse {
    healthy: bool,
}

/// Creates the cache router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(detailed_health))
        .route("/health/simple", get(simple_health))
        .route("/health/connection", get(connection_status))
        .route("/keys/generate", get(generate_key))
        .route("/set", post(set_value))
        .route("/wrap", post(wrap_value))
        .route("/:key", get(get_value).delete(delete_value))
        .route("/", delete(clear_cache))
}

/// Detailed cache health status.
async fn detailed_health(State(state): State<AppState>) -> ApiResult<DetailedStatus> {
    ok(state.cache_health.detailed_status().await)
}

/// Simple boolean health probe.
async fn simple_health(State(state): State<AppState>) -> ApiResult<SimpleHealthResponse> {
    let healthy = state.cache_health.is_healthy().await;
    ok(SimpleHealthResponse { healthy })
}

/// Timed connectivity probe.
async fn connection_status(State(state): State<AppState>) -> ApiResult<ConnectionStatus> {
    ok(state.cache_health.connection_status().await)
}

/// Get a cached value by key.
async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<CacheValueResponse> {
    debug!("Cache get request: {}", key);

    let value: Option<serde_json::Value> = state.cache.get(&key).await;
    ok(CacheValueResponse {
        found: value.is_some(),
        value,
        key,
    })
}

/// Store a value.
async fn set_value(
    State(state): State<AppState>,
    Json(request): Json<SetCacheRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SetCacheResponse>>), AppError> {
    debug!("Cache set request: {}", request.key);

    let _ = state
        .cache
        .set(&request.key, &request.value, request.ttl)
        .await;
    Ok(created(SetCacheResponse {
        message: "Value set successfully",
        key: request.key,
        ttl: request.ttl,
    }))
}

/// Delete one key.
async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<DeleteCacheResponse> {
    debug!("Cache delete request: {}", key);

    let _ = state.cache.del(&key).await;
    ok(DeleteCacheResponse {
        message: "Value deleted successfully",
        key,
    })
}

/// Clear the entire cache.
async fn clear_cache(State(state): State<AppState>) -> ApiResult<ClearCacheResponse> {
    debug!("Cache clear request");

    state.cache.reset().await;
    ok(ClearCacheResponse {
        message: "Cache cleared successfully",
    })
}

/// Exercise the get-or-compute path with an optional simulated delay.
async fn wrap_value(
    State(state): State<AppState>,
    Json(request): Json<WrapTestRequest>,
) -> ApiResult<WrapTestResponse> {
    debug!("Cache wrap request: {}", request.key);

    let WrapTestRequest {
        key,
        data,
        ttl,
        delay_ms,
    } = request;

    let result = state
        .cache
        .wrap(
            &key,
            || async move {
                if let Some(delay) = delay_ms {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Ok(data)
            },
            ttl,
        )
        .await?;

    ok(WrapTestResponse {
        message: "Wrap operation completed",
        key,
        result,
        ttl,
    })
}

/// Deterministic key construction.
async fn generate_key(
    Query(query): Query<GenerateKeyQuery>,
) -> ApiResult<GenerateKeyResponse> {
    let parts: Vec<String> = query
        .parts
        .map(|parts| parts.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let part_refs: Vec<&str> = parts.iter().map(String::as_str).collect();
    let generated_key = CacheService::generate_key(&query.prefix, &part_refs);

    ok(GenerateKeyResponse {
        prefix: query.prefix,
        parts,
        generated_key,
    })
}
