use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use engine::{validate_token, EngineError, KvEngine, SubprocessEngine};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        delete_kv_route, get_all_route, search_kv_route, set_kv_route, update_kv_route, KeyBody,
        KeyValueBody,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod config;

use config::{engine_timeout, load_settings};

const MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
struct AppState {
    engine: Arc<dyn KvEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let engine =
        SubprocessEngine::new(&settings.engine_binary).with_timeout(engine_timeout(&settings));
    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = build_router(state);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, engine_binary = %settings.engine_binary, "relay listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route(set_kv_route(), post(set_kv))
        .route(update_kv_route(), post(update_kv))
        .route(delete_kv_route(), post(delete_kv))
        .route(search_kv_route(), post(search_kv))
        .route(get_all_route(), get(get_all))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn root() -> &'static str {
    "Key-Value Store API"
}

async fn healthz() -> &'static str {
    "ok"
}

type RelayResult = Result<String, (StatusCode, Json<ApiError>)>;

async fn set_kv(State(state): State<AppState>, Json(req): Json<KeyValueBody>) -> RelayResult {
    let key = validate_token("key", &req.key).map_err(reject)?;
    let value = validate_token("value", &req.value).map_err(reject)?;
    state.engine.insert(&key, &value).await.map_err(reject)
}

async fn update_kv(State(state): State<AppState>, Json(req): Json<KeyValueBody>) -> RelayResult {
    let key = validate_token("key", &req.key).map_err(reject)?;
    let value = validate_token("value", &req.value).map_err(reject)?;
    state.engine.update(&key, &value).await.map_err(reject)
}

async fn delete_kv(State(state): State<AppState>, Json(req): Json<KeyBody>) -> RelayResult {
    let key = validate_token("key", &req.key).map_err(reject)?;
    state.engine.delete(&key).await.map_err(reject)
}

async fn search_kv(State(state): State<AppState>, Json(req): Json<KeyBody>) -> RelayResult {
    let key = validate_token("key", &req.key).map_err(reject)?;
    state.engine.search(&key).await.map_err(reject)
}

async fn get_all(State(state): State<AppState>) -> RelayResult {
    state.engine.list_all().await.map_err(reject)
}

/// Validation failures map to 400; everything else the engine can report
/// (spawn failure, non-zero exit, timeout) maps to 502 so clients can tell
/// an engine failure apart from a successful invocation whose stdout
/// happens to contain an error message.
fn reject(err: EngineError) -> (StatusCode, Json<ApiError>) {
    match err {
        EngineError::InvalidArgument { .. } => (
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(ErrorCode::Validation, err.to_string())),
        ),
        EngineError::Spawn { .. } | EngineError::NonZeroExit { .. } | EngineError::Timeout(_) => {
            error!(%err, "engine invocation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::new(ErrorCode::Engine, err.to_string())),
            )
        }
    }
}

#[cfg(test)]
mod tests;
